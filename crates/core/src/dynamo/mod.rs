//! DynamoDB item models, table layouts and deployment planning.

pub mod inmemory;
pub mod machine;
pub mod movie;
pub mod planning;
pub mod stream;
pub mod table;
pub mod traits;

pub use inmemory::InMemoryDynamo;
pub use machine::{
    generate_machine_id, upsert_reading, MachineReading, TemperatureState, MACHINE_NAME_INDEX,
    OVERHEAT_THRESHOLD, STREAMS_TABLE, TEMPERATURE_INDEX,
};
pub use movie::{parse_movie_seeds, Movie, MovieSeed, MOVIES_TABLE, TITLE_INDEX};
pub use planning::{
    calculate_deploy_plan, calculate_destroy_plan, DeployPlan, DestroyPlan, IndexState,
    ResourceStatus, TableChange, TableState,
};
pub use stream::{
    format_image, temperature_state, ChangeRecord, StreamAttribute, StreamChange, StreamImage,
};
pub use table::{
    movies_table_config, streams_table_config, temperature_index, AttributeType, BillingMode,
    GsiConfig, KeyAttribute, ProjectionType, StreamView, TableConfig, Throughput,
};
pub use traits::{MachineRepository, MovieRepository};
