//! Command dispatch

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::TreeGridHandler;
use crate::application::GridHandler;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{BusinessModel, ChildDiff, RowPayload};
use crate::infrastructure::InMemoryGraph;
use crate::tree_traits::TreeNodeConvert;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Tree {
            graph,
            expand_all,
            root_visible,
        }) => cmd_tree(cli, graph, *expand_all, *root_visible),
        Some(Commands::Path { graph, object }) => cmd_path(cli, graph, object),
        Some(Commands::Diff {
            before,
            after,
            objects,
        }) => cmd_diff(cli, before, after, objects),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see --help".to_string(),
        )),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    Ok(Settings::load(cli.config.as_deref())?)
}

fn open_grid(
    cli: &Cli,
    graph: &Arc<InMemoryGraph>,
) -> CliResult<TreeGridHandler<String>> {
    let settings = load_settings(cli)?;
    let model: Arc<dyn BusinessModel<String>> = graph.clone();
    Ok(TreeGridHandler::new(model, graph.root(), settings.grid)?)
}

#[instrument(skip(cli))]
fn cmd_tree(cli: &Cli, graph: &Path, expand_all: bool, root_visible: bool) -> CliResult<()> {
    let graph = Arc::new(InMemoryGraph::load(graph)?);
    let mut handler = open_grid(cli, &graph)?;
    if root_visible {
        handler.set_root_visible(true)?;
    }
    if expand_all {
        handler.expand_all()?;
    }
    debug!(rows = handler.store().visible_row_count(), "grid built");
    output::info(&handler.store().to_tree_string());
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_path(cli: &Cli, graph: &Path, object: &str) -> CliResult<()> {
    let graph = Arc::new(InMemoryGraph::load(graph)?);
    if !graph.contains(object) {
        return Err(CliError::InvalidArgs(format!("unknown object: {object}")));
    }
    let handler = open_grid(cli, &graph)?;
    let path = handler.build_path(&RowPayload::Persisted(object.to_string()))?;
    output::info(&path);
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_diff(cli: &Cli, before: &Path, after: &Path, objects: &[String]) -> CliResult<()> {
    let graph = Arc::new(InMemoryGraph::load(before)?);
    let updated = InMemoryGraph::load(after)?;

    let changed: Vec<String> = if objects.is_empty() {
        graph
            .objects()
            .into_iter()
            .chain(updated.objects())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        for object in objects {
            if !graph.contains(object) && !updated.contains(object) {
                output::warning(&format!("{object} is in neither graph"));
            }
        }
        objects.to_vec()
    };

    let mut handler = open_grid(cli, &graph)?;
    handler.expand_all()?;
    graph.replace_with(&updated);

    let mut diff = ChildDiff::default();
    for object in &changed {
        diff.extend(handler.update_row_model(object)?);
    }

    output::header(&format!(
        "{} added, {} removed",
        diff.added.len(),
        diff.removed.len()
    ));
    for row in &diff.removed {
        output::diff_remove(row);
    }
    for row in &diff.added {
        output::diff_add(row);
    }
    output::info(&handler.store().to_tree_string());
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::info(&format!("global: {}", path.display())),
                None => output::info(&"global: <no home directory>"),
            }
            if let Some(local) = &cli.config {
                output::detail(&format!("local: {}", local.display()));
            }
        }
    }
    Ok(())
}
