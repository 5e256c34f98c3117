pub mod monte_carlo;
pub mod percentiles;
pub mod personnel_lifecycle;
pub mod project_input;
pub mod scope_injector;
pub mod simulation_types;
pub mod task_graph;
pub mod templates;
pub mod week_simulation;
pub mod worker_pool;
