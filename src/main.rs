use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zuno::app::{Dashboard, LearningApp, View};
use zuno::auth::Route;
use zuno::config::Config;
use zuno::feedback::{FeedbackView, ImagePayload};
use zuno::models::{ChatRole, DailyCommitment, DailyTask, TaskId};
use zuno::progress::{motivation, percent_label, week_label};

#[derive(Parser)]
#[command(name = "zuno")]
#[command(about = "One learning task a day, graded by your mentor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with e-mail and password
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Sign out and clear local state
    Logout,
    /// Declare the skills you want to master
    Onboard {
        /// Skill or subject (repeat for several)
        #[arg(short, long = "skill", required = true)]
        skills: Vec<String>,
        /// Hours per day: 0.5, 1, 2 or 3
        #[arg(long, default_value = "1")]
        hours: String,
        /// Target completion date (YYYY-MM-DD), 90 days out by default
        #[arg(long)]
        target_date: Option<NaiveDate>,
        /// Add goals even if some already exist
        #[arg(long)]
        force: bool,
    },
    /// Show today's tasks and streak
    Today,
    /// Show one task of today's plan
    Task { id: TaskId },
    /// Submit work for a task and show the mentor's feedback
    Submit {
        id: TaskId,
        /// Notes or code, inline
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,
        /// Read notes or code from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Screenshot to attach
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Show streak, completion and average score
    Progress,
    /// Show the mentor's summary of the week
    Weekly,
    /// Ask the mentor; without a message, starts an interactive chat
    Chat { message: Vec<String> },
}

/// Initialize tracing on stderr so stdout carries only command output
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "zuno=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn redirected(route: Route) {
    match route {
        Route::Login => println!("Not signed in. Run `zuno login` first."),
        Route::Dashboard => println!("You already have goals. Use --force to add a new topic."),
        other => println!("Continue at {}", other),
    }
}

fn print_task(task: &DailyTask) {
    let status = if task.completed { "Completed" } else { "Start Task" };
    println!("#{} [{}] {}", task.id, task.subject_label(), task.topic);
    if let Some(level) = &task.level {
        println!("    Level: {}", level);
    }
    if let Some(resource) = &task.resource {
        println!("    Resource: {}", resource);
    }
    if !task.instructions.is_empty() {
        println!("    {}", task.instructions);
    }
    println!("    {}", status);
}

fn print_dashboard(dashboard: &Dashboard) {
    if dashboard.is_empty() {
        println!("No Learning Paths Yet");
        println!("You haven't set up your learning goals yet, or we're still preparing your initial tasks.");
        println!("Run `zuno onboard --skill <SKILL>` to set up your goals.");
        return;
    }

    println!("{}", Local::now().format("%A, %b %-d"));
    for task in &dashboard.tasks {
        print_task(task);
    }
    println!();
    println!("Current streak: {} days", dashboard.streak());
    println!("Completion: {}", dashboard.completion_label());
    println!("Zuno: {}", dashboard.mentor_note());
}

fn print_no_progress() {
    println!("No progress data available.");
    println!("Run `zuno onboard --skill <SKILL>` to set up your goals.");
}

fn print_feedback(view: &FeedbackView) {
    println!("Score: {}", view.score_label());
    println!("{}", view.heading());
    println!();
    println!("{}", view.feedback.text);
}

async fn chat_once(app: &LearningApp, message: &str) -> anyhow::Result<bool> {
    match app.send_chat(message).await? {
        View::Ready(reply) => {
            println!("Zuno: {}", reply.turn.text);
            if reply.refreshed {
                println!();
                println!("Today's tasks were updated:");
                for task in app.registry().tasks() {
                    print_task(&task);
                }
            }
            Ok(true)
        }
        View::Redirect(route) => {
            redirected(route);
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load();
    let app = LearningApp::from_config(&config)?;

    match cli.command {
        Commands::Login { email, password } => {
            app.sign_in(&email, &password).await?;
            println!("Signed in as {}", email);
        }
        Commands::Signup { email, password } => match app.sign_up(&email, &password).await? {
            Some(_) => println!("Account created. Run `zuno onboard` to set up your goals."),
            None => println!("Check your inbox to confirm {}, then run `zuno login`.", email),
        },
        Commands::Logout => {
            app.logout().await;
            println!("Signed out.");
        }
        Commands::Onboard {
            skills,
            hours,
            target_date,
            force,
        } => {
            let Some(commitment) = DailyCommitment::from_str(&hours) else {
                bail!("Unsupported daily time '{}': choose 0.5, 1, 2 or 3", hours);
            };
            let mut wizard = match app.onboarding(force).await? {
                View::Ready(wizard) => wizard,
                View::Redirect(route) => {
                    redirected(route);
                    return Ok(());
                }
            };
            wizard.set_skills(skills);
            wizard.set_commitment(commitment);
            wizard.set_target_date(target_date);

            // Collecting -> Scheduling, then Scheduling -> Committing -> Summary.
            wizard.advance().await?;
            wizard.advance().await?;

            println!("You're all set!");
            for goal in wizard.summary() {
                println!();
                println!("Goal #{}: {}", goal.position, goal.subject);
                println!("    Daily commitment: {}", goal.daily_commitment);
                println!("    Level detected: {}", goal.detected_level);
                println!("    Zuno says: {}", goal.message);
            }
        }
        Commands::Today => match app.dashboard().await? {
            View::Ready(dashboard) => print_dashboard(&dashboard),
            View::Redirect(route) => redirected(route),
        },
        Commands::Task { id } => match app.task(id).await? {
            View::Ready(task) => print_task(&task),
            View::Redirect(route) => redirected(route),
        },
        Commands::Submit {
            id,
            text,
            file,
            image,
        } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => bail!("Provide --text or --file"),
            };
            let image = image.map(|path| ImagePayload::from_path(&path)).transpose()?;

            match app.submit(id, &text, image).await? {
                View::Ready(_) => match app.feedback(id).await {
                    View::Ready(view) => print_feedback(&view),
                    View::Redirect(route) => redirected(route),
                },
                View::Redirect(route) => redirected(route),
            }
        }
        Commands::Progress => match app.progress_view().await? {
            View::Ready(Some(snapshot)) => {
                println!("Current streak: {}", snapshot.current_streak);
                println!("Tasks completed: {}", snapshot.completed_tasks);
                println!("Average score: {}", snapshot.average_score);
                println!("Completion rate: {}", percent_label(snapshot.completion_percentage));
                println!("Total tasks: {}", snapshot.total_tasks);
                println!();
                println!("{}", motivation(&snapshot));
            }
            View::Ready(None) => print_no_progress(),
            View::Redirect(route) => redirected(route),
        },
        Commands::Weekly => match app.weekly_summary().await? {
            View::Ready(Some(report)) => {
                let snapshot = &report.snapshot;
                println!("Week of {}", week_label(Local::now().date_naive()));
                println!(
                    "Tasks: {}/{}  Avg score: {}  Completion: {}  Streak: {}",
                    snapshot.completed_tasks,
                    snapshot.total_tasks,
                    snapshot.average_score,
                    percent_label(snapshot.completion_percentage),
                    snapshot.current_streak
                );
                println!();
                println!("{}", report.mentor_text());
            }
            View::Ready(None) => print_no_progress(),
            View::Redirect(route) => redirected(route),
        },
        Commands::Chat { message } if !message.is_empty() => {
            chat_once(&app, &message.join(" ")).await?;
        }
        Commands::Chat { .. } => {
            for turn in app.chat().turns() {
                if turn.role == ChatRole::Mentor {
                    println!("Zuno: {}", turn.text);
                }
            }
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                if !chat_once(&app, &line).await? {
                    break;
                }
            }
        }
    }

    Ok(())
}
