// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_appender::{non_blocking::WorkerGuard, rolling::{RollingFileAppender, Rotation}};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging sink selection. Sink *management* (rotation, daemonization)
/// is outside the engine's scope; this only wires up `tracing`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. "stanag5066_engine=debug".
    pub level: String,
    pub output: LogOutput,
    /// Emit structured JSON lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
    pub file_path: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            output: LogOutput::Stderr,
            json: false,
            file_path: None,
        }
    }
}

/// Initializes the global `tracing` subscriber. Fatal closes, dropped
/// PDUs, SIS bind rejections, and ARQ exhaustion each emit a `warn!`
/// record (endpoint id, protocol, cause) from `io::endpoint`,
/// `io::dispatcher`, `sis::session`, and `dts::arq`; this only picks
/// where those records land.
pub fn init_logger(config: &LogConfig) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_new(&config.level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .context("failed to parse log level")?;

    let (writer, guard) = match config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File => {
            let path = config
                .file_path
                .as_deref()
                .context("file_path is required when output = file")?;
            let path = PathBuf::from(path);
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let appender =
                RollingFileAppender::new(Rotation::NEVER, dir, path.file_name().unwrap_or_default());
            tracing_appender::non_blocking(appender)
        },
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json {
        registry
            .with(fmt::layer().with_writer(writer).json().with_ansi(false))
            .try_init()
            .context("failed to install JSON subscriber")?;
    } else {
        registry
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .try_init()
            .context("failed to install subscriber")?;
    }

    Ok(guard)
}
