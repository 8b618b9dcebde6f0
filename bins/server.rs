use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

fn init_logging(format: &str) {
    common::utils::logging::init_logging(format);
    info!(service = "membership", event = "logger_init", "tracing subscriber initialized");
}

fn main() -> std::process::ExitCode {
    // .env first so RUST_LOG and DATABASE_URL apply
    dotenv().ok();

    let config = configs::AppConfig::load_and_validate();
    let format = config.as_ref().map(|c| c.logging.format.clone()).unwrap_or_else(|_| "compact".into());
    init_logging(&format);

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new({
        let service_id = service_id;
        move |info| {
            error!(
                service = "membership",
                event = "panic",
                %service_id,
                pid,
                message = %info,
                "unhandled panic occurred"
            );
        }
    }));

    let worker_threads = match &config {
        Ok(cfg) => cfg.server.worker_threads,
        Err(e) => {
            error!(service = "membership", event = "config_invalid", error = %e, "configuration rejected");
            return std::process::ExitCode::FAILURE;
        }
    };

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = worker_threads { builder.worker_threads(w); }

    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "membership", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "membership",
        event = "start",
        %service_id,
        pid,
        version,
        threads = worker_threads.unwrap_or_default(),
        "membership service starting"
    );

    // server::run drains connections on Ctrl+C itself; the outer select covers a hung drain
    rt.block_on(async move {
        let server_task = tokio::spawn(async move {
            if let Err(e) = server::run().await {
                error!(service = "membership", event = "run_failed", error = %e, "server::run returned error");
                Err(e)
            } else {
                Ok(())
            }
        });

        tokio::select! {
            res = server_task => {
                match res {
                    Ok(Ok(())) => {
                        info!(service = "membership", event = "stop", %service_id, pid, "server stopped normally");
                        std::process::ExitCode::SUCCESS
                    }
                    Ok(Err(_)) => std::process::ExitCode::FAILURE,
                    Err(e) => {
                        error!(service = "membership", event = "task_join_error", error = %e, "server task join error");
                        std::process::ExitCode::FAILURE
                    }
                }
            }
            _ = async {
                let _ = tokio::signal::ctrl_c().await;
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            } => {
                error!(service = "membership", event = "shutdown_timeout", %service_id, pid, "graceful shutdown timed out");
                std::process::ExitCode::FAILURE
            }
        }
    })
}
