pub mod m202610010001_create_runs;
pub mod m202610010002_index_run_hashes;
