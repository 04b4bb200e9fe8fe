use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use iiab_verify::check::{self, output::Format, VerifyOptions};
use iiab_verify::cli::{Cli, Commands, TargetArgs, TargetKind};
use iiab_verify::config::Config;
use iiab_verify::github::{self, comment, GitHubClient, RepoSlug};
use iiab_verify::matrix;
use iiab_verify::monitor::{install, resources};
use iiab_verify::remote::{Executor, ShellExecutor, Target};
use iiab_verify::utils::{logging, VerifyError};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level, &cli.log_format) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<VerifyError>()
                .map(VerifyError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut cfg = Config::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Verify { target, ubuntu_version, output, format, markdown, warning_threshold } => {
            apply_target_overrides(&mut cfg, &target);
            if let Some(t) = warning_threshold {
                cfg.warning_threshold = t;
            }
            let format: Format = format.parse()?;
            let exec = build_executor(&target, &cfg)?;
            tracing::info!(dest = %exec.target(), "verifying");

            let opts = VerifyOptions {
                format,
                output: output.unwrap_or_else(|| PathBuf::from(format!("verification-{}.json", cfg.vm_name))),
                markdown,
                expected_os: ubuntu_version,
            };
            Ok(check::run_verify(&exec, &cfg, &opts)?)
        }

        Commands::Render { input, output } => {
            check::run_render(&input, output.as_deref())
                .with_context(|| format!("rendering {}", input.display()))?;
            Ok(0)
        }

        Commands::Comment { repo, pr_number, body_file, vm_name, update, token } => {
            let repo: RepoSlug = repo
                .or_else(|| cfg.github.repo.clone())
                .ok_or_else(|| VerifyError::Config("--repo is required".to_string()))?
                .parse()?;
            let client = GitHubClient::new(&cfg.github.api_base, token.unwrap_or_default())?;
            let body = std::fs::read_to_string(&body_file)
                .with_context(|| format!("reading {}", body_file.display()))?;

            let vm = vm_name.unwrap_or_else(|| cfg.vm_name.clone());
            let marker = github::marker_for(&vm);
            let body = github::wrap_body(&marker, &body);

            let posted = if update {
                comment::upsert(&client, &repo, pr_number, &marker, &body)?
            } else {
                comment::post(&client, &repo, pr_number, &body)?
            };
            tracing::info!(url = %posted.html_url, "comment published");
            println!("{}", posted.html_url);
            Ok(0)
        }

        Commands::Monitor { vm_name, interval, max_polls, log_file, resources: resources_sink, resource_interval } => {
            let vm_name = vm_name.unwrap_or_else(|| cfg.vm_name.clone());
            let timeout = Duration::from_secs(cfg.command_timeout_secs);
            let vm = Arc::new(ShellExecutor::new(Target::Multipass { vm: vm_name.clone() }, timeout));
            let host = ShellExecutor::new(Target::Local, timeout);
            let stop = interrupt_flag()?;

            let log_path = log_file.unwrap_or_else(|| PathBuf::from(install::default_log_name()));
            let mut log = install::PollLog::open(&log_path)
                .with_context(|| format!("opening {}", log_path.display()))?;

            let sampler = resources_sink.map(|sink| {
                let exec: Arc<dyn Executor + Send + Sync> = vm.clone();
                resources::ResourceSampler::start(exec, Duration::from_secs(resource_interval), Some(sink))
            });

            let settings = install::PollSettings {
                interval: Duration::from_secs(interval),
                max_polls,
            };
            let outcome = install::wait_for_install(vm.as_ref(), &host, &vm_name, settings, &mut log, &stop);

            if let Some(s) = sampler {
                let peaks = resources::peaks(&s.stop());
                tracing::info!(
                    samples = peaks.samples,
                    cpu = peaks.cpu_percent,
                    mem = peaks.mem_used_percent,
                    disk = peaks.disk_used_percent,
                    "resource peaks"
                );
            }
            let complete = outcome?;
            log.line(&format!("📁 Full log saved to: {}", log_path.display()));
            Ok(if complete { 0 } else { 1 })
        }

        Commands::Resources { target, interval, count, output } => {
            apply_target_overrides(&mut cfg, &target);
            let exec = build_executor(&target, &cfg)?;
            let stop = interrupt_flag()?;
            let peaks = resources::run_foreground(&exec, Duration::from_secs(interval), count, output, &stop)?;
            println!(
                "peak: cpu {:.1}%  mem {:.1}%  disk {:.1}%  ({} samples)",
                peaks.cpu_percent, peaks.mem_used_percent, peaks.disk_used_percent, peaks.samples
            );
            Ok(0)
        }

        Commands::Matrix { versions_file, include_upcoming } => {
            matrix::run_matrix(&versions_file, include_upcoming)?;
            Ok(0)
        }
    }
}

fn apply_target_overrides(cfg: &mut Config, target: &TargetArgs) {
    if let Some(vm) = &target.vm_name {
        cfg.vm_name = vm.clone();
    }
    if let Some(t) = target.timeout {
        cfg.command_timeout_secs = t;
    }
}

fn build_executor(args: &TargetArgs, cfg: &Config) -> Result<ShellExecutor, VerifyError> {
    let target = match args.target {
        TargetKind::Local => Target::Local,
        TargetKind::Multipass => Target::Multipass { vm: cfg.vm_name.clone() },
        TargetKind::Ssh => Target::Ssh {
            host: args
                .host
                .clone()
                .ok_or_else(|| VerifyError::Config("--host is required with --target ssh".to_string()))?,
            user: args.user.clone(),
            port: args.port,
        },
    };
    Ok(ShellExecutor::new(target, Duration::from_secs(cfg.command_timeout_secs)))
}

/// Raised on Ctrl-C; long loops poll it between steps.
fn interrupt_flag() -> Result<Arc<AtomicBool>, VerifyError> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
    .map_err(|e| VerifyError::System(format!("cannot install Ctrl-C handler: {}", e)))?;
    Ok(flag)
}
