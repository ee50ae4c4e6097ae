//! ログ出力の初期化
//!
//! `RUST_LOG` が設定されていればそれを優先し、なければ `info` で出力する。
//! 統合（merge）の監査ログは [`AUDIT_TARGET`](crate::engine::AUDIT_TARGET) ターゲットで出る。

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

/// `RUST_LOG` 未設定時のフィルタ
const DEFAULT_FILTER: &str = "info";

/// `RUST_LOG` を優先し、読めなければ [`DEFAULT_FILTER`]
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// 標準エラー出力へのログを初期化する
///
/// # Errors
/// グローバルな subscriber が既に設定されている
pub fn init() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
}

/// 日次ローテーションのファイルへログを出す
///
/// 返された guard を drop するとバッファが書き出されるので、プロセス終了まで保持すること。
///
/// # Errors
/// グローバルな subscriber が既に設定されている
pub fn init_with_file(dir: &Path, prefix: &str) -> Result<WorkerGuard, TryInitError> {
    let appender = tracing_appender::rolling::daily(dir, prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .try_init()?;

    tracing::info!(dir = %dir.display(), prefix, "File logging initialized");
    Ok(guard)
}
