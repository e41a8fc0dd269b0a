//! Reading inputs and writing results of the matching pipeline

pub mod audit;
pub mod geojson;
pub mod overrides;

pub use audit::{read_report, write_candidates_csv, write_candidates_file, write_report};
pub use geojson::{
    SourceFields, TargetFields, aggregated_to_geojson, layer_to_geojson, parse_source_ways,
    parse_target_edges, read_source_ways, read_target_edges, segments_to_geojson,
    summaries_to_geojson, write_feature_collection,
};
pub use overrides::{parse_id_list, read_id_list, read_overrides};
