//! Tools command implementation.

use crate::cli::Output;
use crate::tools::ToolRegistry;

/// List the tools the agent can call.
pub fn run_tools() {
    Output::header("Tools");
    for descriptor in ToolRegistry::new().descriptors() {
        println!();
        Output::list_item(descriptor.kind.display_name());
        Output::kv("name", descriptor.name);
        Output::kv("usage", descriptor.description);
    }
}
