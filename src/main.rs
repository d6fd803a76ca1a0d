use chrono::Local;
use clap::Parser;
use sflogs::config::{self, Settings};
use sflogs::{LogService, LogSummary};
use std::collections::HashSet;
use std::env;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse Apex logs of the org behind a Salesforce project")]
struct Args {
    #[arg(long, help = "Salesforce project directory (defaults to the current one)", value_name = "PATH")]
    project: Option<String>,

    #[arg(short, long, help = "Show at most N logs", value_name = "N")]
    limit: Option<usize>,

    #[arg(long, help = "Show the method that started a log", value_name = "LOG_ID")]
    info: Option<String>,

    #[arg(long, help = "Search active org users by name or username", value_name = "TERM")]
    users: Option<String>,

    #[arg(long, help = "List logs of another user", value_name = "USER_ID")]
    user: Option<String>,

    #[arg(long, help = "Poll for new logs until interrupted")]
    watch: bool,

    #[arg(long, default_value_t = 5, help = "Seconds between polls in --watch mode", value_name = "SECS")]
    interval: u64,

    #[arg(long, help = "Include download links")]
    verbose: bool,

    #[arg(long, help = "Print JSON instead of text")]
    json: bool,

    #[arg(long, help = "Write the effective settings to the config file and exit")]
    save_config: bool,

    #[arg(long, help = "Delete the config file and exit")]
    reset_config: bool,

    #[arg(long, default_value = "warn", help = "Diagnostic level when RUST_LOG is unset", value_name = "LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    sflogs::logging::init(&args.log_level);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.reset_config {
        if config::delete_settings()? {
            println!("✓ Config removed");
        } else {
            println!("No config file found");
        }
        return Ok(());
    }

    let settings = Settings::load()?;

    if args.save_config {
        let path = config::save_settings(&settings)?;
        println!("✓ Settings saved to {}", path.display());
        return Ok(());
    }

    let service = LogService::from_settings(&settings)?;

    let project = match &args.project {
        Some(path) => path.clone(),
        None => env::current_dir()?.to_string_lossy().to_string(),
    };

    let status = service.set_project_path(&project).await;
    if !status.is_connected {
        eprintln!("Could not connect to an org from {}", project);
        eprintln!("Authorize one for this project by running:");
        eprintln!("  sf org login web --set-default");
        process::exit(1);
    }

    if let Some(user_id) = &args.user {
        if !service.set_user_id(user_id).await {
            return Err(format!("'{}' is not a valid user id", user_id).into());
        }
    }

    if let Some(term) = &args.users {
        handle_user_search(&service, term, &args).await
    } else if let Some(log_id) = &args.info {
        handle_log_info(&service, log_id, &args).await
    } else if args.watch {
        handle_watch(&service, &args).await
    } else {
        handle_list_logs(&service, &args).await
    }
}

async fn handle_user_search(service: &LogService, term: &str, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let users = service.search_users(term).await.logged("search_users");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users matching '{}'", term);
    }
    for user in users {
        println!("{}  {}  <{}>", user.id, user.name, user.username);
    }
    Ok(())
}

async fn handle_log_info(service: &LogService, log_id: &str, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let info = service.get_log_info(log_id).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}  {}", info.log_id, info.method_name);
        if let Some(url) = service.log_download_url(log_id).filter(|_| args.verbose) {
            println!("  {}", url);
        }
    }
    Ok(())
}

async fn handle_list_logs(service: &LogService, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut logs = service.get_logs().await.logged("get_logs");
    if let Some(limit) = args.limit {
        logs.truncate(limit);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&logs)?);
        return Ok(());
    }

    let status = service.status();
    println!("{} @ {}", status.username, status.instance_url);
    if logs.is_empty() {
        println!("No logs found");
    }
    for log in &logs {
        print_log(service, log, args.verbose);
    }
    Ok(())
}

fn print_log(service: &LogService, log: &LogSummary, verbose: bool) {
    println!("{}  {}  [{}]  {} KB",
        log.id,
        log.last_modified,
        log.logged_by_user_name,
        log.length_kb()
    );
    if let Some(url) = service.log_download_url(&log.id).filter(|_| verbose) {
        println!("  {}", url);
    }
}

async fn handle_watch(service: &LogService, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut seen: HashSet<String> = HashSet::new();

    // Existing logs are shown once, then only newcomers.
    let initial = service.get_logs().await.logged("get_logs");
    for log in initial.iter().take(args.limit.unwrap_or(10)).rev() {
        print_log(service, log, args.verbose);
    }
    seen.extend(initial.into_iter().map(|log| log.id));

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        let _ = ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        });
    }

    let interval = Duration::from_secs(args.interval.max(1));
    while running.load(Ordering::SeqCst) {
        tokio::time::sleep(interval).await;
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let logs = service.get_logs().await.logged("get_logs");
        let fresh: Vec<&LogSummary> = logs.iter().filter(|log| !seen.contains(&log.id)).collect();

        for log in fresh.into_iter().rev() {
            seen.insert(log.id.clone());
            let method = match service.get_log_info(&log.id).await {
                Ok(info) => info.method_name,
                Err(e) => {
                    tracing::warn!(log_id = %log.id, error = %e, "could not read log body");
                    sflogs::NO_METHOD_NAME_FOUND.to_string()
                }
            };
            println!("{} [{}] {} {} KB  {}",
                Local::now().format("%H:%M:%S"),
                log.logged_by_user_name,
                log.id,
                log.length_kb(),
                method
            );
        }
    }

    Ok(())
}
