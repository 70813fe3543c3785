/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bpaf::Bpaf;
use euclid::default::Size2D;
use spatial_canvas::app::{CanvasController, CanvasError};
use spatial_canvas::export::{self, ExportError};
use spatial_canvas::filter::FilterMode;
use spatial_canvas::prefs::{CanvasPrefs, PrefsError};
use spatial_canvas::protocol::channel::{ChannelError, in_process};
use spatial_canvas::protocol::{ProtocolError, decode_event};
use spatial_canvas::render::headless::HeadlessEngine;
use spatial_canvas::{VERSION, init_tracing};

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
enum Opts {
    /// Replay a JSON-lines log of authority events through a headless canvas
    /// and print the resulting export snapshot
    #[bpaf(command)]
    Replay {
        /// Canvas preferences (TOML)
        #[bpaf(argument("FILE"))]
        config: Option<PathBuf>,
        /// Filter mode applied after the replay, e.g. `adrs` or `relationships`
        #[bpaf(argument("MODE"))]
        filter: Option<String>,
        /// Log filter directives, overrides RUST_LOG
        #[bpaf(long("log"), argument("FILTER"))]
        log_filter: Option<String>,
        /// Event log, one `{"event": .., "payload": ..}` envelope per line
        #[bpaf(positional("EVENTS"))]
        events: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error(transparent)]
    Prefs(#[from] PrefsError),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("line {line}: {source}")]
    Decode { line: usize, source: ProtocolError },
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

fn main() -> ExitCode {
    match opts().run() {
        Opts::Replay {
            config,
            filter,
            log_filter,
            events,
        } => {
            init_tracing(log_filter.as_deref());
            tracing::debug!(version = VERSION, "spatial-canvas replay");
            match replay(config.as_deref(), filter.as_deref(), &events) {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    tracing::error!("{err}");
                    ExitCode::FAILURE
                },
            }
        },
    }
}

fn replay(config: Option<&Path>, filter: Option<&str>, events: &Path) -> Result<(), ReplayError> {
    let prefs = match config {
        Some(path) => CanvasPrefs::load(path)?,
        None => CanvasPrefs::default(),
    };
    let text = std::fs::read_to_string(events).map_err(|source| ReplayError::Read {
        path: events.to_path_buf(),
        source,
    })?;

    let (client, authority) = in_process();
    let engine = HeadlessEngine::new().with_viewport(Size2D::new(1280.0, 800.0));
    let mut controller = CanvasController::mount(engine, client, prefs)?;

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = decode_event(line).map_err(|source| ReplayError::Decode {
            line: index + 1,
            source,
        })?;
        authority.send(event)?;
    }
    let applied = controller.pump();

    if let Some(name) = filter {
        controller.filter_graph(FilterMode::parse(name));
        let visibility = controller.visibility();
        let join = |ids: Vec<&str>| ids.join(", ");
        eprintln!(
            "filter {}: {} node(s) [{}], {} edge(s) [{}]",
            controller.filter(),
            visibility.nodes.len(),
            join(visibility.nodes.iter().map(|id| id.as_str()).collect()),
            visibility.edges.len(),
            join(visibility.edges.iter().map(|id| id.as_str()).collect()),
        );
    }

    let snapshot = export::serialize(controller.graph())?;
    println!("{}", snapshot.to_json()?);
    tracing::info!(
        events = applied,
        nodes = snapshot.node_count,
        edges = snapshot.edge_count,
        deferred_edges = controller.mirror().pending_edge_count(),
        "replay finished"
    );
    controller.unmount();
    Ok(())
}
