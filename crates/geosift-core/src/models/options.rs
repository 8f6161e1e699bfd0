//! Query options: the declarative description of one query call.

use super::esri::EsriGeometry;
use super::geometry::Geometry;
use super::spatial_reference::SpatialReference;
use crate::error::{GeosiftError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Geometric relation tested between a feature and the query geometry.
///
/// Read as "feature RELATION query geometry": `Within` keeps features lying
/// inside the query geometry, `Contains` keeps features that contain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum SpatialRelation {
    #[default]
    Intersects,
    Contains,
    Within,
    Disjoint,
    Touches,
    Overlaps,
    Crosses,
}

impl SpatialRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpatialRelation::Intersects => "intersects",
            SpatialRelation::Contains => "contains",
            SpatialRelation::Within => "within",
            SpatialRelation::Disjoint => "disjoint",
            SpatialRelation::Touches => "touches",
            SpatialRelation::Overlaps => "overlaps",
            SpatialRelation::Crosses => "crosses",
        }
    }
}

impl FromStr for SpatialRelation {
    type Err = GeosiftError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        let name = lower.strip_prefix("esrispatialrel").unwrap_or(&lower);
        match name {
            "intersects" => Ok(SpatialRelation::Intersects),
            "contains" => Ok(SpatialRelation::Contains),
            "within" => Ok(SpatialRelation::Within),
            "disjoint" => Ok(SpatialRelation::Disjoint),
            "touches" => Ok(SpatialRelation::Touches),
            "overlaps" => Ok(SpatialRelation::Overlaps),
            "crosses" => Ok(SpatialRelation::Crosses),
            _ => Err(GeosiftError::invalid_option(
                "spatialRel",
                format!("unknown relation '{}'", s),
            )),
        }
    }
}

impl TryFrom<String> for SpatialRelation {
    type Error = GeosiftError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SpatialRelation> for String {
    fn from(relation: SpatialRelation) -> Self {
        relation.as_str().to_string()
    }
}

impl fmt::Display for SpatialRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `geometry` option in any of its accepted shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryGeometry {
    GeoJson(Geometry),
    Esri(EsriGeometry),
    Bbox([f64; 4]),
    /// `"xmin,ymin,xmax,ymax"` or a WKT geometry
    Text(String),
}

impl QueryGeometry {
    /// The spatial reference carried by the geometry itself
    pub fn spatial_reference(&self) -> Option<&SpatialReference> {
        match self {
            QueryGeometry::Esri(esri) => esri.spatial_reference(),
            _ => None,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One `orderByFields` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default, alias = "order")]
    pub direction: SortDirection,
}

impl SortField {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Ascending }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Descending }
    }
}

impl FromStr for SortField {
    type Err = GeosiftError;

    /// Parse `"field"`, `"field ASC"` or `"field DESC"`
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let field = parts.next().ok_or_else(|| {
            GeosiftError::invalid_option("orderByFields", "empty field name")
        })?;
        let direction = match parts.next().map(|d| d.to_uppercase()) {
            None => SortDirection::Ascending,
            Some(d) if d == "ASC" => SortDirection::Ascending,
            Some(d) if d == "DESC" => SortDirection::Descending,
            Some(d) => {
                return Err(GeosiftError::invalid_option(
                    "orderByFields",
                    format!("unknown sort direction '{}' for field {}", d, field),
                ))
            }
        };
        if parts.next().is_some() {
            return Err(GeosiftError::invalid_option(
                "orderByFields",
                format!("unexpected text after '{}'", s.trim()),
            ));
        }
        Ok(SortField { field: field.to_string(), direction })
    }
}

/// Accepted wire shapes for `orderByFields`
#[derive(Deserialize)]
#[serde(untagged)]
pub enum OrderBySource {
    Text(String),
    List(Vec<OrderByEntry>),
}

#[derive(Deserialize)]
#[serde(untagged)]
pub enum OrderByEntry {
    Text(String),
    Field {
        field: String,
        #[serde(default, alias = "direction")]
        order: Option<String>,
    },
}

/// Parsed `orderByFields`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrderBySource")]
pub struct OrderBy(pub Vec<SortField>);

impl TryFrom<OrderBySource> for OrderBy {
    type Error = GeosiftError;

    fn try_from(source: OrderBySource) -> Result<Self> {
        let fields = match source {
            OrderBySource::Text(text) => text
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(str::parse)
                .collect::<Result<Vec<_>>>()?,
            OrderBySource::List(entries) => entries
                .into_iter()
                .map(|entry| match entry {
                    OrderByEntry::Text(text) => text.parse(),
                    OrderByEntry::Field { field, order } => match order {
                        Some(order) => format!("{} {}", field, order).parse(),
                        None => field.parse(),
                    },
                })
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(OrderBy(fields))
    }
}

impl FromStr for OrderBy {
    type Err = GeosiftError;

    fn from_str(s: &str) -> Result<Self> {
        OrderBy::try_from(OrderBySource::Text(s.to_string()))
    }
}

/// `outFields`: all attributes or a named subset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OutFieldsSource")]
pub enum OutFields {
    All,
    Named(Vec<String>),
}

/// Accepted wire shapes for `outFields`
#[derive(Deserialize)]
#[serde(untagged)]
pub enum OutFieldsSource {
    Text(String),
    List(Vec<String>),
}

impl From<OutFieldsSource> for OutFields {
    fn from(source: OutFieldsSource) -> Self {
        let names: Vec<String> = match source {
            OutFieldsSource::Text(text) => {
                text.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
            }
            OutFieldsSource::List(list) => list,
        };
        if names.is_empty() || names.iter().any(|n| n == "*") {
            OutFields::All
        } else {
            OutFields::Named(names)
        }
    }
}

/// Aggregate function kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateKind::Count => "count",
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
        }
    }
}

impl TryFrom<String> for AggregateKind {
    type Error = GeosiftError;

    fn try_from(value: String) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "count" => Ok(AggregateKind::Count),
            "sum" => Ok(AggregateKind::Sum),
            "avg" | "average" | "mean" => Ok(AggregateKind::Avg),
            "min" => Ok(AggregateKind::Min),
            "max" => Ok(AggregateKind::Max),
            _ => Err(GeosiftError::invalid_option(
                "aggregates",
                format!("unknown aggregate type '{}'", value),
            )),
        }
    }
}

/// One aggregate computed per group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    #[serde(rename = "type", alias = "statisticType")]
    pub kind: AggregateKind,
    #[serde(alias = "onStatisticField")]
    pub field: String,
    #[serde(default, alias = "outStatisticFieldName")]
    pub name: Option<String>,
}

impl Aggregate {
    pub fn new(kind: AggregateKind, field: impl Into<String>) -> Self {
        Self { kind, field: field.into(), name: None }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Output attribute name: explicit name or `<type>_<field>`
    pub fn output_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("{}_{}", self.kind.as_str(), self.field))
    }
}

/// Options recognized by a query call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    /// Attribute predicate source
    #[serde(rename = "where")]
    pub where_clause: Option<String>,

    /// Spatial filter geometry
    pub geometry: Option<QueryGeometry>,

    /// Spatial reference of the query geometry when it carries none
    #[serde(rename = "inSR")]
    pub in_sr: Option<SpatialReference>,

    pub spatial_rel: Option<SpatialRelation>,

    /// Output spatial reference (`outSR` on the wire is accepted too)
    #[serde(alias = "outSR")]
    pub projection: Option<SpatialReference>,

    /// Decimal digits kept in output coordinates
    pub geometry_precision: Option<i64>,

    /// Emit Esri geometries (rings/paths) instead of GeoJSON
    pub to_esri: bool,

    pub limit: Option<i64>,

    #[serde(alias = "resultOffset")]
    pub offset: Option<i64>,

    pub order_by_fields: Option<OrderBy>,

    #[serde(alias = "fields")]
    pub out_fields: Option<OutFields>,

    pub return_geometry: bool,

    #[serde(alias = "outStatistics")]
    pub aggregates: Vec<Aggregate>,

    #[serde(alias = "groupByFieldsForStatistics")]
    pub group_by: Vec<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            where_clause: None,
            geometry: None,
            in_sr: None,
            spatial_rel: None,
            projection: None,
            geometry_precision: None,
            to_esri: false,
            limit: None,
            offset: None,
            order_by_fields: None,
            out_fields: None,
            return_geometry: true,
            aggregates: Vec::new(),
            group_by: Vec::new(),
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from their JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GeosiftError::invalid_option("options", e.to_string()))
    }

    /// Set the attribute predicate
    pub fn where_clause(mut self, predicate: impl Into<String>) -> Self {
        self.where_clause = Some(predicate.into());
        self
    }

    /// Set the spatial filter geometry
    pub fn geometry(mut self, geometry: QueryGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn in_sr(mut self, sr: SpatialReference) -> Self {
        self.in_sr = Some(sr);
        self
    }

    pub fn spatial_rel(mut self, relation: SpatialRelation) -> Self {
        self.spatial_rel = Some(relation);
        self
    }

    /// Set the output spatial reference
    pub fn projection(mut self, sr: SpatialReference) -> Self {
        self.projection = Some(sr);
        self
    }

    pub fn geometry_precision(mut self, digits: i64) -> Self {
        self.geometry_precision = Some(digits);
        self
    }

    pub fn to_esri(mut self, to_esri: bool) -> Self {
        self.to_esri = to_esri;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order_by(mut self, fields: Vec<SortField>) -> Self {
        self.order_by_fields = Some(OrderBy(fields));
        self
    }

    pub fn out_fields(mut self, fields: OutFields) -> Self {
        self.out_fields = Some(fields);
        self
    }

    pub fn return_geometry(mut self, return_geometry: bool) -> Self {
        self.return_geometry = return_geometry;
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregates.push(aggregate);
        self
    }

    pub fn group_by(mut self, fields: Vec<String>) -> Self {
        self.group_by = fields;
        self
    }

    /// Decimal digits requested, validated
    pub fn precision(&self) -> Result<Option<u32>> {
        match self.geometry_precision {
            None => Ok(None),
            Some(digits) if digits < 0 => Err(GeosiftError::invalid_option(
                "geometryPrecision",
                format!("must be a non-negative integer, got {}", digits),
            )),
            Some(digits) => u32::try_from(digits).map(Some).map_err(|_| {
                GeosiftError::invalid_option("geometryPrecision", format!("{} is too large", digits))
            }),
        }
    }

    /// Result limit requested, validated
    pub fn result_limit(&self) -> Result<Option<usize>> {
        match self.limit {
            None => Ok(None),
            Some(limit) if limit <= 0 => Err(GeosiftError::invalid_option(
                "limit",
                format!("must be a positive integer, got {}", limit),
            )),
            Some(limit) => Ok(Some(usize::try_from(limit).unwrap_or(usize::MAX))),
        }
    }

    /// Result offset requested, validated
    pub fn result_offset(&self) -> Result<usize> {
        match self.offset {
            None => Ok(0),
            Some(offset) if offset < 0 => Err(GeosiftError::invalid_option(
                "offset",
                format!("must be a non-negative integer, got {}", offset),
            )),
            Some(offset) => Ok(usize::try_from(offset).unwrap_or(usize::MAX)),
        }
    }

    /// Check every option that can be checked without data
    pub fn validate(&self) -> Result<()> {
        self.precision()?;
        self.result_limit()?;
        self.result_offset()?;

        if let Some(OrderBy(fields)) = &self.order_by_fields {
            if fields.iter().any(|f| f.field.trim().is_empty()) {
                return Err(GeosiftError::invalid_option("orderByFields", "empty field name"));
            }
        }
        if self.group_by.iter().any(|f| f.trim().is_empty()) {
            return Err(GeosiftError::invalid_option("groupBy", "empty field name"));
        }
        if !self.group_by.is_empty() && self.aggregates.is_empty() {
            return Err(GeosiftError::invalid_option(
                "groupBy",
                "grouping requires at least one aggregate",
            ));
        }
        if self.aggregates.iter().any(|a| a.field.trim().is_empty()) {
            return Err(GeosiftError::invalid_option("aggregates", "empty field name"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_from_json() {
        let options: QueryOptions = serde_json::from_value(json!({
            "where": "a = 1",
            "outSR": {"latestWkid": 3857},
            "limit": 1,
            "geometryPrecision": 3,
            "toEsri": true,
            "orderByFields": "pop DESC, name"
        }))
        .unwrap();

        assert_eq!(options.where_clause.as_deref(), Some("a = 1"));
        assert_eq!(options.projection, Some(SpatialReference::latest_wkid(3857)));
        assert_eq!(options.limit, Some(1));
        assert!(options.to_esri);
        assert!(options.return_geometry);
        assert_eq!(
            options.order_by_fields,
            Some(OrderBy(vec![SortField::descending("pop"), SortField::ascending("name")]))
        );
    }

    #[test]
    fn test_projection_alias() {
        let options: QueryOptions = serde_json::from_value(json!({"projection": 3857})).unwrap();
        assert_eq!(options.projection, Some(SpatialReference::Wkid(3857)));
    }

    #[test]
    fn test_spatial_relation_names() {
        assert_eq!("intersects".parse::<SpatialRelation>().unwrap(), SpatialRelation::Intersects);
        assert_eq!(
            "esriSpatialRelWithin".parse::<SpatialRelation>().unwrap(),
            SpatialRelation::Within
        );
        assert!("near".parse::<SpatialRelation>().is_err());
        assert_eq!(SpatialRelation::default(), SpatialRelation::Intersects);
    }

    #[test]
    fn test_order_by_shapes() {
        let from_list: OrderBy = serde_json::from_value(json!(["a DESC", {"field": "b", "order": "ASC"}])).unwrap();
        assert_eq!(from_list.0, vec![SortField::descending("a"), SortField::ascending("b")]);

        assert!("a SIDEWAYS".parse::<OrderBy>().is_err());
    }

    #[test]
    fn test_out_fields_shapes() {
        let all: OutFields = serde_json::from_value(json!("*")).unwrap();
        assert_eq!(all, OutFields::All);

        let named: OutFields = serde_json::from_value(json!("a, b")).unwrap();
        assert_eq!(named, OutFields::Named(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_aggregate_aliases() {
        let agg: Aggregate = serde_json::from_value(json!({
            "statisticType": "sum",
            "onStatisticField": "pop",
            "outStatisticFieldName": "total"
        }))
        .unwrap();
        assert_eq!(agg.kind, AggregateKind::Sum);
        assert_eq!(agg.output_name(), "total");
        assert_eq!(Aggregate::new(AggregateKind::Max, "pop").output_name(), "max_pop");
    }

    #[test]
    fn test_validation() {
        assert!(QueryOptions::new().validate().is_ok());

        let err = QueryOptions::new().geometry_precision(-1).validate().unwrap_err();
        assert!(matches!(err, GeosiftError::InvalidOption { ref option, .. } if option == "geometryPrecision"));

        let err = QueryOptions::new().limit(0).validate().unwrap_err();
        assert!(matches!(err, GeosiftError::InvalidOption { ref option, .. } if option == "limit"));

        let err = QueryOptions::new().offset(-3).validate().unwrap_err();
        assert!(matches!(err, GeosiftError::InvalidOption { ref option, .. } if option == "offset"));

        let err = QueryOptions::new().group_by(vec!["a".to_string()]).validate().unwrap_err();
        assert!(matches!(err, GeosiftError::InvalidOption { ref option, .. } if option == "groupBy"));
    }

    #[test]
    fn test_query_geometry_shapes() {
        let bbox: QueryGeometry = serde_json::from_value(json!([-10.0, -10.0, 10.0, 10.0])).unwrap();
        assert!(matches!(bbox, QueryGeometry::Bbox(_)));

        let geojson: QueryGeometry =
            serde_json::from_value(json!({"type": "Point", "coordinates": [1, 2]})).unwrap();
        assert!(matches!(geojson, QueryGeometry::GeoJson(_)));

        let envelope: QueryGeometry = serde_json::from_value(json!({
            "xmin": 0, "ymin": 0, "xmax": 1, "ymax": 1, "spatialReference": {"wkid": 102100}
        }))
        .unwrap();
        assert!(matches!(envelope, QueryGeometry::Esri(_)));
        assert!(envelope.spatial_reference().is_some());
    }
}
