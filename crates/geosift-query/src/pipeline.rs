use crate::aggregate::aggregate;
use crate::filter::{self, FilterNode};
use crate::sort::sort_features;
use geosift_core::config::LayeredConfig;
use geosift_core::error::Result;
use geosift_core::models::{
    CanonicalSr, EsriFeature, Feature, OutFields, OutputFeature, Properties, QueryOptions,
    SortField, SpatialReference, SpatialRelation,
};
use geosift_geo::validation::ensure_valid;
use geosift_geo::{
    reference, to_esri, GeoRelations, ProjTransforms, Projector, RelationProvider,
    SpatialFilter, TransformProvider,
};
use tracing::debug;

/// Query pipeline over an in-memory feature collection.
///
/// Stages run in a fixed order: attribute and spatial filtering, grouping,
/// sorting, pagination, projection with rounding, attribute selection, and
/// finally conversion to the Esri convention.
pub struct QueryPipeline<T = ProjTransforms, R = GeoRelations>
where
    T: TransformProvider,
    R: RelationProvider,
{
    transforms: T,
    relations: R,
    native_sr: CanonicalSr,
    default_relation: SpatialRelation,
    max_record_count: Option<usize>,
}

impl Default for QueryPipeline {
    fn default() -> Self {
        Self::new(ProjTransforms::new(), GeoRelations)
    }
}

impl QueryPipeline {
    /// Build an engine with the default providers from layered configuration
    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        let native = reference::resolve(&SpatialReference::wkid(config.native_sr.value))?;
        Ok(Self::default()
            .with_native_sr(native)
            .with_default_relation(config.spatial_rel.value)
            .with_max_record_count(config.max_record_count.value))
    }
}

/// Query state compiled once per call
struct Plan {
    filter: Option<FilterNode>,
    spatial: Option<SpatialFilter>,
    projector: Option<Projector>,
    offset: usize,
    take: usize,
}

impl<T, R> QueryPipeline<T, R>
where
    T: TransformProvider,
    R: RelationProvider,
{
    /// Create a pipeline whose data is in WGS 84
    pub fn new(transforms: T, relations: R) -> Self {
        Self {
            transforms,
            relations,
            native_sr: CanonicalSr::wgs84(),
            default_relation: SpatialRelation::default(),
            max_record_count: None,
        }
    }

    /// Reference the stored coordinates are expressed in
    pub fn with_native_sr(mut self, native_sr: CanonicalSr) -> Self {
        self.native_sr = native_sr;
        self
    }

    pub fn with_default_relation(mut self, relation: SpatialRelation) -> Self {
        self.default_relation = relation;
        self
    }

    /// Cap on returned rows, applied on top of any `limit`
    pub fn with_max_record_count(mut self, max: Option<usize>) -> Self {
        self.max_record_count = max;
        self
    }

    pub fn native_sr(&self) -> &CanonicalSr {
        &self.native_sr
    }

    /// Run one query.
    ///
    /// Any invalid option, malformed clause or unresolvable reference fails
    /// the whole call before a single feature is examined.
    pub fn execute(&self, features: &[Feature], options: &QueryOptions) -> Result<Vec<OutputFeature>> {
        let plan = self.plan(options)?;

        let matches = |feature: &&Feature| self.matches(&plan, feature);
        let order: &[SortField] = options.order_by_fields.as_ref().map(|o| o.0.as_slice()).unwrap_or_default();

        // Phase 1: Filter, then group and sort when asked to
        let selected: Vec<Feature> = if !options.aggregates.is_empty() {
            let mut rows = aggregate(features.iter().filter(matches), &options.aggregates, &options.group_by);
            sort_features(&mut rows, order);
            rows.into_iter().skip(plan.offset).take(plan.take).collect()
        } else if !order.is_empty() {
            // Sorting needs every match before anything can be cut
            let mut rows: Vec<Feature> = features.iter().filter(matches).cloned().collect();
            debug!("{} of {} features passed filters", rows.len(), features.len());
            sort_features(&mut rows, order);
            rows.into_iter().skip(plan.offset).take(plan.take).collect()
        } else {
            features.iter().filter(matches).skip(plan.offset).take(plan.take).cloned().collect()
        };
        debug!("{} rows selected (offset {}, limit {})", selected.len(), plan.offset, plan.take);

        // Phase 2: Shape each row for output
        let outputs = selected
            .into_iter()
            .map(|feature| self.shape(feature, &plan, options))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Query returned {} {} rows",
            outputs.len(),
            if options.to_esri { "Esri" } else { "GeoJSON" }
        );
        Ok(outputs)
    }

    fn plan(&self, options: &QueryOptions) -> Result<Plan> {
        options.validate()?;
        let precision = options.precision()?;
        let offset = options.result_offset()?;
        let limit = options.result_limit()?;

        let filter = match options.where_clause.as_deref() {
            Some(clause) => filter::compile(clause)?,
            None => None,
        };
        if let Some(node) = &filter {
            debug!("Compiled where clause: {}", node);
        }

        let spatial = options
            .geometry
            .as_ref()
            .map(|geometry| {
                SpatialFilter::prepare(
                    geometry,
                    options.in_sr.as_ref(),
                    &self.native_sr,
                    options.spatial_rel.unwrap_or(self.default_relation),
                    &self.transforms,
                )
            })
            .transpose()?;

        let projector = match &options.projection {
            Some(target) => {
                let target = reference::resolve(target)?;
                debug!("Projecting output from {} to {}", self.native_sr, target);
                Some(Projector::new(&self.transforms, &self.native_sr, &target, precision)?)
            }
            None => precision.map(Projector::precision_only),
        }
        .filter(|projector| !projector.is_identity());

        let take = match (limit, self.max_record_count) {
            (Some(limit), Some(max)) => limit.min(max),
            (Some(n), None) | (None, Some(n)) => n,
            (None, None) => usize::MAX,
        };

        Ok(Plan { filter, spatial, projector, offset, take })
    }

    fn matches(&self, plan: &Plan, feature: &Feature) -> bool {
        if let Some(filter) = &plan.filter {
            if !filter.matches(feature) {
                return false;
            }
        }
        match (&plan.spatial, &feature.geometry) {
            (None, _) => true,
            (Some(spatial), Some(geometry)) => spatial.matches(geometry, &self.relations),
            (Some(_), None) => false,
        }
    }

    fn shape(&self, feature: Feature, plan: &Plan, options: &QueryOptions) -> Result<OutputFeature> {
        let Feature { id, geometry, properties } = feature;

        let geometry = geometry.filter(|_| options.return_geometry);
        if let Some(geometry) = &geometry {
            ensure_valid(geometry)?;
        }
        let geometry = match (geometry, &plan.projector) {
            (Some(geometry), Some(projector)) => Some(projector.project(&geometry)?),
            (geometry, _) => geometry,
        };

        // Statistic rows are built from the requested aggregates, not outFields
        let properties = if options.aggregates.is_empty() {
            select_fields(properties, options.out_fields.as_ref())
        } else {
            properties
        };

        if options.to_esri {
            let geometry = geometry.as_ref().map(to_esri).transpose()?;
            Ok(OutputFeature::Esri(EsriFeature { geometry, attributes: properties }))
        } else {
            Ok(OutputFeature::GeoJson(Feature { id, geometry, properties }))
        }
    }
}

/// Keep only the requested attributes, in their original order
fn select_fields(properties: Properties, out_fields: Option<&OutFields>) -> Properties {
    match out_fields {
        None | Some(OutFields::All) => properties,
        Some(OutFields::Named(names)) => properties
            .into_iter()
            .filter(|(key, _)| names.iter().any(|name| name.eq_ignore_ascii_case(key)))
            .collect(),
    }
}
