use crate::table::Table;

/// Two-column point projection for map rendering.
#[derive(Debug, Clone)]
pub struct GeoView {
    pub lat_column: String,
    pub lon_column: String,
    /// Rows with a null in either coordinate are already dropped.
    pub points: Table,
}

/// Heuristic geo-column detection: the first column whose name contains
/// `lat` (case-insensitive) takes the latitude role, the first containing
/// `lon` the longitude role. Selection is first-match-per-role and pairing
/// is not verified; with three or more candidates the outcome is positional,
/// not semantic. Fewer than two distinct matches means no map view.
pub fn extract_geo_points(table: &Table) -> Option<GeoView> {
    let lat_column = table
        .columns()
        .iter()
        .find(|c| c.to_lowercase().contains("lat"))?
        .clone();
    let lon_column = table
        .columns()
        .iter()
        .find(|c| c.to_lowercase().contains("lon"))?
        .clone();
    if lat_column == lon_column {
        return None;
    }

    let lat = table.column_index(&lat_column)?;
    let lon = table.column_index(&lon_column)?;
    let rows = table
        .rows()
        .iter()
        .filter(|row| !row[lat].is_null() && !row[lon].is_null())
        .map(|row| vec![row[lat].clone(), row[lon].clone()])
        .collect();

    Some(GeoView {
        points: Table::from_parts(vec![lat_column.clone(), lon_column.clone()], rows),
        lat_column,
        lon_column,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requires_two_distinct_matching_columns() {
        let (table, _) = Table::from_results(&[json!({"Latitude": 1.0, "name": "a"})]);
        assert!(extract_geo_points(&table).is_none());

        let (table, _) = Table::from_results(&[json!({"name": "a"})]);
        assert!(extract_geo_points(&table).is_none());
    }

    #[test]
    fn picks_first_match_per_role() {
        let (table, _) = Table::from_results(&[json!({
            "geo.lat": 10.0,
            "geo.lon": 20.0,
            "site_latitude": 30.0,
        })]);
        let view = extract_geo_points(&table).unwrap();
        assert_eq!(view.lat_column, "geo.lat");
        assert_eq!(view.lon_column, "geo.lon");
        assert_eq!(view.points.columns(), &["geo.lat", "geo.lon"]);
    }

    #[test]
    fn drops_rows_with_null_coordinates() {
        let (table, _) = Table::from_results(&[
            json!({"lat": 1.0, "lon": 2.0}),
            json!({"lat": null, "lon": 2.0}),
            json!({"lat": 1.0, "lon": null}),
        ]);
        let view = extract_geo_points(&table).unwrap();
        assert_eq!(view.points.n_rows(), 1);
        assert_eq!(view.points.value(0, "lat"), Some(&json!(1.0)));
    }
}
