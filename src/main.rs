//! task-planner - command line entry point
//!
//! Each sub-command maps to one store operation; `send-reminders` is the
//! entry point for the periodic (cron) reminder broadcast.

use anyhow::bail;
use clap::{Parser, Subcommand};
use task_planner::util::is_valid_email;
use task_planner::{Config, SubscriptionStore, TaskId, TaskPlanner, TaskStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "task-planner",
    version,
    about = "Personal task list with email reminders"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Add a task
    Add {
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// List all tasks
    #[command(alias = "ls")]
    List,
    /// Mark a task as completed
    Complete { id: TaskId },
    /// Mark a task as not completed
    Reopen { id: TaskId },
    /// Delete a task
    #[command(alias = "rm")]
    Delete { id: TaskId },
    /// Start a subscription and mail a verification code
    Subscribe { email: String },
    /// Confirm a subscription
    Verify { email: String, code: String },
    /// Mail a fresh verification code
    Resend { email: String },
    /// Stop reminders for an address
    Unsubscribe { email: String },
    /// Show the subscription state of an address
    Status { email: String },
    /// Mail pending tasks to every verified subscriber
    SendReminders,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_planner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    info!(
        "Using {:?} store in {}",
        config.store_type,
        config.data_dir.display()
    );
    let planner = TaskPlanner::from_config(&config);

    run(&planner, cli.command).await
}

async fn run(planner: &TaskPlanner, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Add { name } => {
            let task = planner.tasks().add_task(&name.join(" ")).await?;
            println!("Added task {}: {}", task.id, task.name);
        }
        Command::List => {
            let tasks = planner.tasks().list_tasks().await;
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in tasks {
                let mark = if task.completed { "x" } else { " " };
                println!("[{}] {:>4}  {}", mark, task.id, task.name);
            }
        }
        Command::Complete { id } => {
            planner.tasks().set_completed(id, true).await?;
            println!("Task status updated!");
        }
        Command::Reopen { id } => {
            planner.tasks().set_completed(id, false).await?;
            println!("Task status updated!");
        }
        Command::Delete { id } => {
            planner.tasks().delete_task(id).await?;
            println!("Task deleted.");
        }
        Command::Subscribe { email } => {
            planner.subscribe(&email).await?;
            println!("Verification code sent to your email!");
        }
        Command::Verify { email, code } => {
            planner
                .subscriptions()
                .verify_code(&email, code.trim())
                .await?;
            println!("Email verified successfully!");
        }
        Command::Resend { email } => {
            planner.resend_code(&email).await?;
            println!("A new verification code has been sent to your email!");
        }
        Command::Unsubscribe { email } => {
            let email = email.trim();
            if !is_valid_email(email) {
                bail!("Invalid or missing email address: {:?}", email);
            }
            planner.subscriptions().unsubscribe(email).await?;
            println!("You have unsubscribed successfully!");
        }
        Command::Status { email } => {
            let state = if planner.subscriptions().is_verified(&email).await {
                "verified"
            } else if planner.subscriptions().is_pending(&email).await {
                "pending verification"
            } else {
                "not subscribed"
            };
            println!("{}: {}", email.trim(), state);
        }
        Command::SendReminders => {
            let sent = planner.send_reminders().await;
            if sent == 0 {
                info!("Reminder run completed: no emails sent");
            }
            println!("Sent pending tasks to {} subscribers", sent);
        }
    }
    Ok(())
}
