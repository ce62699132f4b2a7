// Administration forms and their client-side validation rules
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::network::{Operation, StationKind, StationStatus};
use super::session::ADMINISTRATOR_ROLE;

const MIN_ADMIN_PASSWORD: usize = 6;
const MIN_NEW_PASSWORD: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Multipart submission ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormPayload {
    pub fields: Vec<(String, String)>,
    pub photo: Option<PhotoUpload>,
}

impl FormPayload {
    fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push((name.to_string(), value.into()));
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("form has {} invalid field(s)", .fields.len())]
pub struct FormErrors {
    pub fields: Vec<FieldError>,
}

impl FormErrors {
    pub fn single(field: &'static str, message: &str) -> Self {
        Self {
            fields: vec![FieldError {
                field,
                message: message.to_string(),
            }],
        }
    }
}

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &'static str, message: &str) {
        self.errors.push(FieldError {
            field,
            message: message.to_string(),
        });
    }

    /// Records `missing` when blank, otherwise `invalid` when `rule` rejects the value.
    fn text(
        &mut self,
        field: &'static str,
        value: &str,
        missing: &str,
        rule: impl Fn(&str) -> bool,
        invalid: &str,
    ) {
        if value.trim().is_empty() {
            self.fail(field, missing);
        } else if !rule(value) {
            self.fail(field, invalid);
        }
    }

    fn photo(&mut self, mode: FormMode, photo: &Option<PhotoUpload>) {
        if mode == FormMode::Create && photo.is_none() {
            self.fail("foto", "Select a photo");
        }
    }

    fn finish(self) -> Result<(), FormErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(FormErrors {
                fields: self.errors,
            })
        }
    }
}

fn letters_and_spaces(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
}

fn description_text(value: &str) -> bool {
    value.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || c.is_whitespace()
            || "áéíóúÁÉÍÓÚñÑüÜ/%.,()-'\"“”".contains(c)
    })
}

fn variable_text(value: &str) -> bool {
    value.chars().all(|c| {
        c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() || "%°/³ºμ.*+()-".contains(c)
    })
}

fn decimal(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    all_digits(whole) && fraction.is_none_or(all_digits)
}

pub fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    let clean = |s: &str| !s.is_empty() && !s.contains('@') && !s.chars().any(char::is_whitespace);
    clean(local)
        && clean(domain)
        && domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut check = Checker::default();
        check.text("email", &self.email, "Enter an email", looks_like_email, "Enter a valid email");
        if self.password.is_empty() {
            check.fail("password", "Enter a password");
        }
        check.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MicrocuencaForm {
    #[serde(default)]
    pub external_id: Option<String>,
    pub name: String,
    pub description: String,
}

impl MicrocuencaForm {
    pub fn into_payload(
        self,
        mode: FormMode,
        photo: Option<PhotoUpload>,
    ) -> Result<FormPayload, FormErrors> {
        let mut check = Checker::default();
        check.text("nombre", &self.name, "Enter a name", letters_and_spaces, "Enter a valid name");
        check.text(
            "descripcion",
            &self.description,
            "Enter a description",
            description_text,
            "Enter a valid description",
        );
        check.photo(mode, &photo);
        check.finish()?;

        let mut payload = FormPayload::default();
        if let Some(id) = self.external_id {
            payload = payload.text("external_id", id);
        }
        payload = payload
            .text("nombre", self.name.to_uppercase())
            .text("descripcion", self.description);
        payload.photo = photo;
        Ok(payload)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationForm {
    #[serde(default)]
    pub external_id: Option<String>,
    pub microcuenca_id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub longitude: String,
    pub latitude: String,
    pub altitude: String,
    pub kind: String,
    pub device_id: String,
}

impl StationForm {
    pub fn into_payload(
        self,
        mode: FormMode,
        photo: Option<PhotoUpload>,
    ) -> Result<FormPayload, FormErrors> {
        let mut check = Checker::default();
        check.text("nombre", &self.name, "Enter a name", |_| true, "");
        check.text("id_dispositivo", &self.device_id, "Enter the device id", |_| true, "");
        check.text(
            "descripcion",
            &self.description,
            "Enter a description",
            description_text,
            "Enter a valid description",
        );
        let coordinate = "Enter a valid coordinate (decimal number)";
        check.text("longitud", &self.longitude, "Enter the longitude", decimal, coordinate);
        check.text("latitud", &self.latitude, "Enter the latitude", decimal, coordinate);
        check.text("altitud", &self.altitude, "Enter the altitude", decimal, coordinate);
        let kind = StationKind::parse(&self.kind);
        if kind.is_none() {
            check.fail("tipo", "Select a station type");
        }
        let status = StationStatus::parse(&self.status);
        if status.is_none() {
            check.fail("estado", "Select a status");
        }
        check.photo(mode, &photo);
        check.finish()?;

        let (Some(kind), Some(status)) = (kind, status) else {
            return Err(FormErrors::single("tipo", "Select a station type"));
        };

        let mut payload = FormPayload::default();
        if mode == FormMode::Edit {
            if let Some(id) = self.external_id {
                payload = payload.text("external_id", id);
            }
        }
        payload = payload
            .text("nombre", self.name.to_uppercase())
            .text("descripcion", self.description)
            .text("estado", status.as_form_value())
            .text("longitud", self.longitude)
            .text("latitud", self.latitude)
            .text("altitud", self.altitude)
            .text("tipo", kind.as_str())
            .text("id_dispositivo", self.device_id)
            .text("id_microcuenca", self.microcuenca_id);
        payload.photo = photo;
        Ok(payload)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariableForm {
    #[serde(default)]
    pub external_id: Option<String>,
    pub name: String,
    pub unit: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub operations: Vec<String>,
}

impl VariableForm {
    pub fn into_payload(
        self,
        mode: FormMode,
        photo: Option<PhotoUpload>,
    ) -> Result<FormPayload, FormErrors> {
        let mut check = Checker::default();
        check.text("nombre", &self.name, "Enter a name", variable_text, "Enter a valid name");
        check.text(
            "unidad_medida",
            &self.unit,
            "Enter a unit of measure",
            variable_text,
            "Enter a valid unit",
        );
        let operations: Vec<Operation> =
            self.operations.iter().filter_map(|op| Operation::parse(op)).collect();
        if operations.is_empty() {
            check.fail("operaciones", "Select at least one operation");
        }
        check.photo(mode, &photo);
        check.finish()?;

        let mut payload = FormPayload::default()
            .text("nombre", self.name.to_uppercase())
            .text("unidad_medida", self.unit);
        if let Some(id) = self.external_id {
            payload = payload.text("external_id", id);
        }
        for operation in operations {
            payload = payload.text("operaciones[]", operation.as_str());
        }
        payload.photo = photo;
        Ok(payload)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdministratorForm {
    #[serde(default)]
    pub external_id: Option<String>,
    pub names: String,
    pub surnames: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_active", deserialize_with = "bool_or_text")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Multipart forms send a lone checkbox as a plain string.
fn one_or_many<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrText {
    Bool(bool),
    Text(String),
}

fn bool_or_text<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match BoolOrText::deserialize(deserializer)? {
        BoolOrText::Bool(value) => Ok(value),
        BoolOrText::Text(text) => match text.trim() {
            "true" | "on" | "1" => Ok(true),
            "false" | "off" | "0" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid flag {:?}", other))),
        },
    }
}

impl AdministratorForm {
    pub fn into_payload(
        self,
        mode: FormMode,
        photo: Option<PhotoUpload>,
    ) -> Result<FormPayload, FormErrors> {
        let mut check = Checker::default();
        check.text("nombres", &self.names, "Enter the names", letters_and_spaces, "Enter valid names");
        check.text(
            "apellidos",
            &self.surnames,
            "Enter the surnames",
            letters_and_spaces,
            "Enter valid surnames",
        );
        check.text("telefono", &self.phone, "Enter a phone number", decimal, "Enter a valid number");
        check.text("correo", &self.email, "Enter an email", looks_like_email, "Invalid email");

        let password = self.password.filter(|p| !p.is_empty());
        match (&password, mode) {
            (None, FormMode::Create) => check.fail("clave", "Enter a password"),
            (Some(p), _) if p.chars().count() < MIN_ADMIN_PASSWORD => {
                check.fail("clave", "Minimum 6 characters")
            }
            _ => {}
        }
        check.finish()?;

        let mut payload = FormPayload::default();
        if mode == FormMode::Edit {
            if let Some(id) = self.external_id {
                payload = payload.text("external_id", id);
            }
        }
        payload = payload
            .text("nombres", self.names)
            .text("apellidos", self.surnames)
            .text("telefono", self.phone)
            .text("correo", self.email)
            .text("estado", self.active.to_string())
            .text("rol", ADMINISTRATOR_ROLE);
        if let Some(password) = password {
            payload = payload.text("clave", password);
        }
        payload.photo = photo;
        Ok(payload)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut check = Checker::default();
        if self.current_password.is_empty() {
            check.fail("currentPassword", "Enter your current password");
        }
        if self.new_password.is_empty() {
            check.fail("newPassword", "Enter a new password");
        } else if self.new_password.chars().count() < MIN_NEW_PASSWORD {
            check.fail("newPassword", "Minimum 8 characters");
        }
        if self.confirm_password != self.new_password {
            check.fail("confirmNewPassword", "Passwords do not match");
        }
        check.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo() -> Option<PhotoUpload> {
        Some(PhotoUpload {
            file_name: "foto.jpg".to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![1, 2, 3],
        })
    }

    fn fields(errors: FormErrors) -> Vec<&'static str> {
        errors.fields.into_iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_decimal_rule() {
        assert!(decimal("-79.2"));
        assert!(decimal("2100"));
        assert!(!decimal("1."));
        assert!(!decimal(".5"));
        assert!(!decimal("1e3"));
    }

    #[test]
    fn test_email_rule() {
        assert!(looks_like_email("ana@unl.edu.ec"));
        assert!(!looks_like_email("ana@unl"));
        assert!(!looks_like_email("ana unl@x.ec"));
        assert!(!looks_like_email("a@b@c.ec"));
        assert!(!looks_like_email("ana@.ec"));
    }

    #[test]
    fn test_credentials() {
        let ok = Credentials {
            email: "ana@unl.edu.ec".to_string(),
            password: "x".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = Credentials {
            email: "ana".to_string(),
            password: String::new(),
        };
        assert_eq!(fields(bad.validate().unwrap_err()), vec!["email", "password"]);
    }

    #[test]
    fn test_microcuenca_requires_photo_on_create_only() {
        let form = MicrocuencaForm {
            external_id: None,
            name: "Zamora Huayco".to_string(),
            description: "Cuenca alta, 2.100 m (aprox.)".to_string(),
        };
        let errors = form.clone().into_payload(FormMode::Create, None).unwrap_err();
        assert_eq!(fields(errors), vec!["foto"]);

        let payload = form.into_payload(FormMode::Edit, None).unwrap();
        assert_eq!(payload.field("nombre"), Some("ZAMORA HUAYCO"));
        assert!(payload.photo.is_none());
    }

    #[test]
    fn test_microcuenca_name_rejects_digits() {
        let form = MicrocuencaForm {
            external_id: None,
            name: "Cuenca 2".to_string(),
            description: "ok".to_string(),
        };
        let errors = form.into_payload(FormMode::Create, photo()).unwrap_err();
        assert_eq!(fields(errors), vec!["nombre"]);
    }

    #[test]
    fn test_station_form() {
        let form = StationForm {
            external_id: Some("st-1".to_string()),
            microcuenca_id: "mc-1".to_string(),
            name: "El Carmen".to_string(),
            description: "Estación principal".to_string(),
            status: "NO OPERATIVA".to_string(),
            longitude: "-79.2".to_string(),
            latitude: "-4.01".to_string(),
            altitude: "2100".to_string(),
            kind: "hidrologica".to_string(),
            device_id: "dev-9".to_string(),
        };
        let payload = form.clone().into_payload(FormMode::Edit, None).unwrap();
        assert_eq!(payload.field("external_id"), Some("st-1"));
        assert_eq!(payload.field("nombre"), Some("EL CARMEN"));
        assert_eq!(payload.field("tipo"), Some("HIDROLOGICA"));
        assert_eq!(payload.field("estado"), Some("NO OPERATIVA"));
        assert_eq!(payload.field("id_microcuenca"), Some("mc-1"));

        let invalid = StationForm {
            latitude: "abc".to_string(),
            kind: String::new(),
            ..form
        };
        let errors = invalid.into_payload(FormMode::Create, photo()).unwrap_err();
        assert_eq!(fields(errors), vec!["latitud", "tipo"]);
    }

    #[test]
    fn test_variable_form_requires_an_operation() {
        let form = VariableForm {
            external_id: None,
            name: "temperatura_aire".to_string(),
            unit: "°C".to_string(),
            operations: vec!["promedio".to_string(), "MAX".to_string()],
        };
        let payload = form.clone().into_payload(FormMode::Create, photo()).unwrap();
        assert_eq!(payload.field("nombre"), Some("TEMPERATURA_AIRE"));
        assert_eq!(payload.all("operaciones[]"), vec!["PROMEDIO", "MAX"]);

        let none = VariableForm {
            operations: vec!["MEDIANA".to_string()],
            ..form
        };
        let errors = none.into_payload(FormMode::Create, photo()).unwrap_err();
        assert_eq!(fields(errors), vec!["operaciones"]);
    }

    #[test]
    fn test_administrator_password_rules() {
        let form = AdministratorForm {
            external_id: None,
            names: "Ana Maria".to_string(),
            surnames: "Torres".to_string(),
            phone: "0991234567".to_string(),
            email: "ana@unl.edu.ec".to_string(),
            password: None,
            active: true,
        };
        let errors = form.clone().into_payload(FormMode::Create, None).unwrap_err();
        assert_eq!(fields(errors), vec!["clave"]);

        let short = AdministratorForm {
            password: Some("12345".to_string()),
            ..form.clone()
        };
        assert!(short.into_payload(FormMode::Edit, None).is_err());

        let payload = form.into_payload(FormMode::Edit, None).unwrap();
        assert_eq!(payload.field("clave"), None);
        assert_eq!(payload.field("rol"), Some(ADMINISTRATOR_ROLE));
        assert_eq!(payload.field("estado"), Some("true"));
    }

    #[test]
    fn test_password_change() {
        let change = PasswordChange {
            current_password: "old".to_string(),
            new_password: "longenough".to_string(),
            confirm_password: "different1".to_string(),
        };
        assert_eq!(fields(change.validate().unwrap_err()), vec!["confirmNewPassword"]);
    }

    #[test]
    fn test_text_fields_deserialize_into_forms() {
        let variable: VariableForm = serde_json::from_value(serde_json::json!({
            "name": "LLUVIA", "unit": "mm", "operations": "SUMA"
        }))
        .unwrap();
        assert_eq!(variable.operations, vec!["SUMA".to_string()]);

        let admin: AdministratorForm = serde_json::from_value(serde_json::json!({
            "names": "Ana", "surnames": "Paz", "phone": "0991", "email": "ana@unl.edu.ec", "active": "false"
        }))
        .unwrap();
        assert!(!admin.active);
    }
}
