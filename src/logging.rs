//! Logging Module
//!
//! コマンドライン用の`tracing`サブスクライバーの初期化。

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// コマンドライン用のロガーを初期化する
///
/// `RUST_LOG`が設定されている場合はそちらが優先されます。
///
/// # 引数
///
/// * `verbose` - `true`の場合、行単位の詳細ログ（debug）も出力する
pub fn init_cli_logger(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("xlsxdiary=debug,info")
        } else {
            EnvFilter::new("xlsxdiary=info")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
