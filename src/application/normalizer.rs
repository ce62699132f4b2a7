// Measurement normalizer - Groups latest readings by variable for the live cards
use crate::domain::measurement::{
    GroupedVariable, MeasurementRecord, READING_PALETTE, StationReading, VariableDefinition,
    format_name,
};

/// Group `records` by variable type in first-seen order, resolving icon and
/// unit through `catalog`. A variable missing from the catalog still gets a
/// group, with an empty icon.
pub fn normalize(records: &[MeasurementRecord], catalog: &[VariableDefinition]) -> Vec<GroupedVariable> {
    let mut groups: Vec<GroupedVariable> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        if record.variable_type.trim().is_empty() {
            tracing::debug!("Skipping reading from {} without variable type", record.station);
            continue;
        }

        let position = match groups
            .iter()
            .position(|g| g.variable_type == record.variable_type)
        {
            Some(position) => position,
            None => {
                groups.push(new_group(record, catalog));
                groups.len() - 1
            }
        };

        groups[position].stations.push(StationReading {
            station: record.station.clone(),
            value: record.numeric_value(),
            color: READING_PALETTE[index % READING_PALETTE.len()],
        });
    }

    groups
}

fn new_group(record: &MeasurementRecord, catalog: &[VariableDefinition]) -> GroupedVariable {
    let definition = catalog.iter().find(|d| d.matches(&record.variable_type));
    if definition.is_none() {
        tracing::debug!("No catalog entry for variable {}", record.variable_type);
    }

    let unit = record
        .unit
        .clone()
        .filter(|u| !u.is_empty())
        .or_else(|| definition.map(|d| d.unit.clone()))
        .unwrap_or_default();
    let icon = definition
        .and_then(|d| d.icon.clone())
        .unwrap_or_default();

    GroupedVariable {
        variable_type: record.variable_type.clone(),
        label: format_name(&record.variable_type),
        icon,
        unit,
        stations: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(station: &str, variable: &str, value: &str, unit: Option<&str>) -> MeasurementRecord {
        MeasurementRecord::new(
            station.to_string(),
            variable.to_string(),
            value.to_string(),
            unit.map(str::to_string),
            None,
            None,
        )
    }

    fn catalog() -> Vec<VariableDefinition> {
        vec![
            VariableDefinition::new("Temperatura".to_string(), "°C".to_string(), Some("temp.png".to_string())),
            VariableDefinition::new("lluvia".to_string(), "mm".to_string(), Some("rain.png".to_string())),
        ]
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let records = vec![
            reading("A", "LLUVIA", "1.2", None),
            reading("A", "TEMPERATURA", "18", None),
            reading("B", "LLUVIA", "0.4", None),
        ];
        let groups = normalize(&records, &catalog());

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].variable_type, "LLUVIA");
        assert_eq!(groups[0].label, "Lluvia");
        assert_eq!(groups[0].icon, "rain.png");
        assert_eq!(groups[0].unit, "mm");
        let stations: Vec<_> = groups[0].stations.iter().map(|s| s.station.as_str()).collect();
        assert_eq!(stations, vec!["A", "B"]);
        assert_eq!(groups[0].stations[1].color, READING_PALETTE[2]);
        assert_eq!(groups[1].stations[0].value, Some(18.0));
    }

    #[test]
    fn test_missing_catalog_entry_is_not_an_error() {
        let records = vec![
            reading("A", "CAUDAL", "3", Some("m3/s")),
            reading("A", "NIVEL_AGUA", "x", None),
        ];
        let groups = normalize(&records, &catalog());

        assert_eq!(groups[0].icon, "");
        assert_eq!(groups[0].unit, "m3/s");
        assert_eq!(groups[1].unit, "");
        assert_eq!(groups[1].stations[0].value, None);
    }

    #[test]
    fn test_record_unit_wins_over_catalog_unit() {
        let records = vec![reading("A", "temperatura", "18", Some("K"))];
        let groups = normalize(&records, &catalog());
        assert_eq!(groups[0].unit, "K");
        assert_eq!(groups[0].icon, "temp.png");
    }

    #[test]
    fn test_skips_records_without_variable() {
        let records = vec![reading("A", " ", "1", None)];
        assert!(normalize(&records, &catalog()).is_empty());
    }

    #[test]
    fn test_normalize_is_idempotent_over_flattened_groups() {
        let records = vec![
            reading("B", "TEMPERATURA", "17", None),
            reading("A", "LLUVIA", "1.2", None),
            reading("A", "TEMPERATURA", "18", None),
            reading("C", "LLUVIA", "0.0", None),
        ];
        let first = normalize(&records, &catalog());

        let flattened: Vec<MeasurementRecord> = first
            .iter()
            .flat_map(|group| {
                group.stations.iter().map(|s| {
                    let value = s.value.map(|v| v.to_string()).unwrap_or_default();
                    reading(&s.station, &group.variable_type, &value, Some(&group.unit))
                })
            })
            .collect();
        let second = normalize(&flattened, &catalog());

        let shape = |groups: &[GroupedVariable]| -> Vec<(String, Vec<String>)> {
            groups
                .iter()
                .map(|g| (g.variable_type.clone(), g.stations.iter().map(|s| s.station.clone()).collect()))
                .collect()
        };
        assert_eq!(shape(&first), shape(&second));
    }
}
