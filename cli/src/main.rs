use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(name = "nosh", version, about = "Nosh CLI — meal logging and progress dashboards from the terminal")]
struct Cli {
    /// API base URL
    #[arg(long, env = "NOSH_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// User ID (temporary, will be replaced by auth)
    #[arg(long, env = "NOSH_USER_ID")]
    user_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Dashboard summary over a date window
    Dashboard {
        /// Window start (ISO date, inclusive). Defaults to six days before end.
        #[arg(long)]
        start: Option<String>,
        /// Window end (ISO date, inclusive). Defaults to today.
        #[arg(long)]
        end: Option<String>,
    },
    /// Workout profile and progress status
    Progress {
        #[command(subcommand)]
        command: ProgressCommands,
    },
    /// Log a meal (the AI estimates its calories)
    Log {
        /// e.g. "breakfast", "lunch", "dinner", "snack"
        #[arg(long)]
        meal_type: String,
        /// Food item; repeat for multiple items
        #[arg(long = "food", required = true)]
        food_items: Vec<String>,
        /// Mood while eating
        #[arg(long)]
        mood: Option<String>,
    },
    /// Add glasses of water to today's log
    Water {
        #[arg(long)]
        glasses: i32,
    },
}

#[derive(Subcommand)]
enum ProgressCommands {
    /// Show progress status over the trailing week
    Show,
    /// Save the workout profile
    Set {
        /// e.g. "daily", "3_per_week", "never"
        #[arg(long)]
        workout_frequency: String,
        /// Calories burned per workout session
        #[arg(long)]
        calories_per_workout: f64,
        /// "lose", "maintain", or "gain"
        #[arg(long)]
        goal: String,
    },
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
    std::process::exit(1);
}

fn require_user_id(user_id: Option<String>) -> String {
    user_id.unwrap_or_else(|| {
        exit_error(
            "user_id is required for this operation",
            Some("Set --user-id or NOSH_USER_ID env var"),
        );
    })
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Health => health(&cli.api_url).await,
        Commands::Dashboard { start, end } => {
            let user_id = require_user_id(cli.user_id);
            dashboard(&cli.api_url, &user_id, start.as_deref(), end.as_deref()).await
        }
        Commands::Progress { command } => {
            let user_id = require_user_id(cli.user_id);
            match command {
                ProgressCommands::Show => progress_show(&cli.api_url, &user_id).await,
                ProgressCommands::Set {
                    workout_frequency,
                    calories_per_workout,
                    goal,
                } => {
                    progress_set(
                        &cli.api_url,
                        &user_id,
                        &workout_frequency,
                        calories_per_workout,
                        &goal,
                    )
                    .await
                }
            }
        }
        Commands::Log {
            meal_type,
            food_items,
            mood,
        } => {
            let user_id = require_user_id(cli.user_id);
            log_meal(&cli.api_url, &user_id, &meal_type, &food_items, mood.as_deref()).await
        }
        Commands::Water { glasses } => {
            let user_id = require_user_id(cli.user_id);
            water(&cli.api_url, &user_id, glasses).await
        }
    };

    if let Err(e) = result {
        exit_error(&e.to_string(), None);
    }
}

async fn health(api_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let resp = client().get(format!("{api_url}/health")).send().await?;
    let body: serde_json::Value = resp.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn dashboard(
    api_url: &str,
    user_id: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut url = format!("{api_url}/v1/dashboard");
    let mut params = Vec::new();

    if let Some(s) = start {
        params.push(format!("start={s}"));
    }
    if let Some(e) = end {
        params.push(format!("end={e}"));
    }
    if !params.is_empty() {
        url = format!("{}?{}", url, params.join("&"));
    }

    let resp = client()
        .get(&url)
        .header("x-user-id", user_id)
        .send()
        .await?;

    print_response(resp).await
}

async fn progress_show(api_url: &str, user_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let resp = client()
        .get(format!("{api_url}/v1/progress"))
        .header("x-user-id", user_id)
        .send()
        .await?;

    print_response(resp).await
}

async fn progress_set(
    api_url: &str,
    user_id: &str,
    workout_frequency: &str,
    calories_per_workout: f64,
    goal: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = json!({
        "workout_frequency": workout_frequency,
        "calories_per_workout": calories_per_workout,
        "goal": goal
    });

    let resp = client()
        .post(format!("{api_url}/v1/progress"))
        .header("x-user-id", user_id)
        .json(&body)
        .send()
        .await?;

    print_response(resp).await
}

async fn log_meal(
    api_url: &str,
    user_id: &str,
    meal_type: &str,
    food_items: &[String],
    mood: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut body = json!({
        "meal_type": meal_type,
        "food_items": food_items
    });
    if let Some(m) = mood {
        body["mood"] = json!(m);
    }

    let resp = client()
        .post(format!("{api_url}/v1/food-log"))
        .header("x-user-id", user_id)
        .json(&body)
        .send()
        .await?;

    print_response(resp).await
}

async fn water(
    api_url: &str,
    user_id: &str,
    glasses: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = json!({ "glasses": glasses });

    let resp = client()
        .patch(format!("{api_url}/v1/food-log/water"))
        .header("x-user-id", user_id)
        .json(&body)
        .send()
        .await?;

    print_response(resp).await
}

async fn print_response(resp: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await?;

    if !status.is_success() {
        eprintln!("{}", serde_json::to_string_pretty(&body)?);
        std::process::exit(1);
    }

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
