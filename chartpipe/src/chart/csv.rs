//! CSV export of normalized chart data.
//!
//! Format: header row `label,<series1>,<series2>,...` with quoted
//! labels where needed, CRLF row separators and empty cells (never `0`)
//! for missing values.

use super::data::{DataGroup, RankingPoint, ScatterPoint};

/// Quotes a CSV cell when it contains a comma, quote or newline.
fn escape_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn format_value(value: f64) -> String {
    // Serialize whole numbers without a trailing ".0".
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Transposes data groups into CSV: one column per group, one row per
/// point label, labels in first-seen order.
pub fn data_groups_to_csv(data_groups: &[DataGroup]) -> String {
    if data_groups.is_empty() {
        return String::new();
    }
    let mut row_labels: Vec<&str> = Vec::new();
    for group in data_groups {
        for point in &group.points {
            if !row_labels.contains(&point.label.as_str()) {
                row_labels.push(&point.label);
            }
        }
    }

    let mut lines = Vec::with_capacity(row_labels.len() + 1);
    let header: Vec<String> = std::iter::once("label".to_string())
        .chain(data_groups.iter().map(|g| escape_cell(&g.label)))
        .collect();
    lines.push(header.join(","));

    for label in row_labels {
        let mut row = vec![escape_cell(label)];
        for group in data_groups {
            let cell = group
                .points
                .iter()
                .find(|p| p.label == label)
                .map(|p| format_value(p.value))
                .unwrap_or_default();
            row.push(cell);
        }
        lines.push(row.join(","));
    }
    lines.join("\r\n")
}

/// CSV for a ranking table: `rank,place,<variable>` rows in the given
/// point order.
pub fn ranking_points_to_csv(points: &[RankingPoint], variable_name: &str) -> String {
    let mut lines = Vec::with_capacity(points.len() + 1);
    lines.push(format!("rank,place,{}", escape_cell(variable_name)));
    for (idx, point) in points.iter().enumerate() {
        let value = point.value.map(format_value).unwrap_or_default();
        lines.push(format!(
            "{},{},{}",
            idx + 1,
            escape_cell(point.label()),
            value
        ));
    }
    lines.join("\r\n")
}

/// CSV for a multi-column ranking table: `rank,place,<var1>,<var2>,...`
/// with one row per place in the given order. `values[i]` maps place
/// dcid to the i-th variable's value; missing values are empty cells.
pub fn ranking_table_to_csv(
    order: &[RankingPoint],
    variable_names: &[&str],
    values: &[std::collections::HashMap<String, f64>],
) -> String {
    let mut header = vec!["rank".to_string(), "place".to_string()];
    header.extend(variable_names.iter().map(|name| escape_cell(name)));
    let mut lines = Vec::with_capacity(order.len() + 1);
    lines.push(header.join(","));
    for (idx, point) in order.iter().enumerate() {
        let mut row = vec![format!("{}", idx + 1), escape_cell(point.label())];
        for column in values {
            let cell = column
                .get(&point.place_dcid)
                .map(|v| format_value(*v))
                .unwrap_or_default();
            row.push(cell);
        }
        lines.push(row.join(","));
    }
    lines.join("\r\n")
}

/// CSV for scatter data: one row per place with both paired values.
pub fn scatter_points_to_csv(points: &[ScatterPoint]) -> String {
    let mut lines = Vec::with_capacity(points.len() + 1);
    lines.push("placeName,placeDcid,xDate,xValue,yDate,yValue".to_string());
    for point in points {
        lines.push(format!(
            "{},{},{},{},{},{}",
            escape_cell(&point.place_name),
            point.place_dcid,
            point.x_date,
            format_value(point.x_value),
            point.y_date,
            format_value(point.y_value),
        ));
    }
    lines.join("\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::data::DataPoint;

    #[test]
    fn test_empty_data_groups() {
        assert_eq!(data_groups_to_csv(&[]), "");
    }

    #[test]
    fn test_single_group_with_quoted_label() {
        let group = DataGroup::new(
            "dataGroup, A",
            vec![DataPoint::new("2020", 1.0), DataPoint::new("2021", 2.0)],
        );
        assert_eq!(
            data_groups_to_csv(&[group]),
            "label,\"dataGroup, A\"\r\n2020,1\r\n2021,2"
        );
    }

    #[test]
    fn test_multiple_groups() {
        let a = DataGroup::new(
            "dataGroup, A",
            vec![DataPoint::new("2020", 1.0), DataPoint::new("2021", 2.0)],
        );
        let b = DataGroup::new(
            "dataGroupB",
            vec![DataPoint::new("2020", 3.0), DataPoint::new("2021", 4.0)],
        );
        assert_eq!(
            data_groups_to_csv(&[a, b]),
            "label,\"dataGroup, A\",dataGroupB\r\n2020,1,3\r\n2021,2,4"
        );
    }

    #[test]
    fn test_missing_values_are_empty_cells() {
        let a = DataGroup::new("A", vec![DataPoint::new("2020", 1.0)]);
        let b = DataGroup::new("B", vec![DataPoint::new("2021", 4.0)]);
        assert_eq!(
            data_groups_to_csv(&[a, b]),
            "label,A,B\r\n2020,1,\r\n2021,,4"
        );
    }

    #[test]
    fn test_ranking_csv() {
        let points = vec![
            RankingPoint {
                place_dcid: "geoId/06".to_string(),
                place_name: Some("California".to_string()),
                value: Some(39000000.0),
                date: Some("2021".to_string()),
            },
            RankingPoint {
                place_dcid: "geoId/48".to_string(),
                place_name: None,
                value: None,
                date: None,
            },
        ];
        assert_eq!(
            ranking_points_to_csv(&points, "Count_Person"),
            "rank,place,Count_Person\r\n1,California,39000000\r\n2,geoId/48,"
        );
    }

    #[test]
    fn test_quote_escaping_doubles_quotes() {
        assert_eq!(escape_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
