/// Interfaces Layer - External Entry Points
///
/// ## Modules
/// - `cli`: command-line interface (main.rs logic) and the node console

pub mod cli;
