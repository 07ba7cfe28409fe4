//! Renshuu CLI
//!
//! Command-line client for the Renshuu API:
//! - Register and inspect the profile
//! - Read today's dashboard, a day's meals and meal history
//! - Log meals (walking the same drawer steps as the app), weight and goals

use anyhow::{anyhow, bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;

use renshuu::api::dto::{
    ApiHealthResponse, DashboardResponse, FoodSearchResponse, HistoryResponse, MealsResponse,
    RegisterRequest, WeightListResponse,
};
use renshuu::api::USER_ID_HEADER;
use renshuu::drawer::{
    parse_weight_form, CustomFoodForm, DrawerController, DrawerKind, DrawerPayload, GoalsForm,
    PortionPicker, ProfileForm, QuickAction,
};
use renshuu::meals::{grouped_totals, DayMeals};
use renshuu::refresh::RefreshEvent;
use renshuu::storage::{
    CustomFood, DailySummary, FoodOptions, FoodSearchResult, MealFood, MealType, MealWithFoods,
    Profile, UserGoal, WeightLog,
};

#[derive(Parser)]
#[command(name = "renshuu")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Log meals, weight and goals against a Renshuu server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    pub api_url: String,

    /// User id sent as the x-user-id header
    #[arg(short, long, env = "RENSHUU_USER", global = true)]
    pub user: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create your profile
    Register {
        /// Full name
        name: String,
    },

    /// Show or update your profile
    Profile {
        #[arg(long)]
        height: Option<String>,
        #[arg(long)]
        age: Option<String>,
        /// sedentary, light, moderate, active, very_active
        #[arg(long)]
        activity: Option<String>,
    },

    /// Today's meals, totals and goal
    Today,

    /// Meals logged on a date
    Meals {
        /// Date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// One line per day over a range (default: last 7 days)
    History {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Search the food catalog
    Search {
        /// At least two characters
        query: String,
    },

    /// Log a food into a meal
    LogMeal {
        /// breakfast, lunch, dinner or snack
        #[arg(short, long)]
        meal_type: MealType,
        /// Food name to search for
        #[arg(long)]
        food: String,
        /// Portion name (default: the smallest portion)
        #[arg(short, long)]
        portion: Option<String>,
        /// Add-on name; repeat for several
        #[arg(short, long)]
        addon: Vec<String>,
        /// Meal date (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Calories for a custom food, used when the search finds nothing
        #[arg(long)]
        calories: Option<String>,
        #[arg(long, default_value = "")]
        protein: String,
        #[arg(long, default_value = "")]
        carbs: String,
        #[arg(long, default_value = "")]
        fats: String,
    },

    /// Record body weight
    LogWeight {
        /// Weight in kg
        weight: String,
        /// Date (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Start a new daily goal
    SetGoals {
        #[arg(long)]
        calories: String,
        #[arg(long)]
        protein: String,
        #[arg(long)]
        carbs: String,
        #[arg(long)]
        fats: String,
        #[arg(long, default_value = "")]
        fiber: String,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Recent weight logs
    Weight {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Check the server and database
    Health,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Thin JSON client; non-2xx responses become errors carrying the server message
struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    user: Option<String>,
}

impl ApiClient {
    fn new(base_url: &str, user: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user,
        }
    }

    fn request(&self, method: Method, path: &str) -> anyhow::Result<reqwest::RequestBuilder> {
        let user = self
            .user
            .as_deref()
            .ok_or_else(|| anyhow!("no user given: pass --user or set RENSHUU_USER"))?;
        Ok(self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(USER_ID_HEADER, user))
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> anyhow::Result<T> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.context("unexpected response body");
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("no error message")
            .to_string();
        bail!("{} ({})", message, status)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<T> {
        let response = self.request(Method::GET, path)?.query(query).send().await?;
        Self::read(response).await
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let response = self.request(method, path)?.json(body).send().await?;
        Self::read(response).await
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = ApiClient::new(&cli.api_url, cli.user.clone());
    let json = cli.format == "json";
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Register { name } => {
            let profile: Profile = client
                .send(Method::POST, "/api/v1/profile", &RegisterRequest { full_name: name })
                .await?;
            println!("Registered {} ({})", profile.full_name, profile.role.as_str());
        }

        Commands::Profile {
            height,
            age,
            activity,
        } => {
            let form = ProfileForm {
                height_cm: height.as_deref().unwrap_or(""),
                age: age.as_deref().unwrap_or(""),
                activity_level: activity.as_deref().unwrap_or(""),
            };
            let update = form.parse()?;

            let profile: Profile = if update.is_empty() {
                client.get("/api/v1/profile", &[]).await?
            } else {
                let mut drawer = DrawerController::new();
                drawer.open_profile();
                let profile = client.send(Method::PATCH, "/api/v1/profile", &update).await?;
                report_refresh(&drawer.finish_save()?);
                profile
            };
            print_profile(&profile, json)?;
        }

        Commands::Today => {
            let dashboard: DashboardResponse = client.get("/api/v1/today", &[]).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                print_day(dashboard.date, &dashboard.meals, dashboard.summary.as_ref());
                print_goal(dashboard.goal.as_ref());
            }
        }

        Commands::Meals { date } => {
            let date = date.unwrap_or(today);
            let day: MealsResponse = client
                .get("/api/v1/meals", &[("date", date.to_string())])
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&day)?);
            } else {
                print_day(day.date, &day.meals, day.summary.as_ref());
            }
        }

        Commands::History { start, end } => {
            let mut query = Vec::new();
            if let Some(start) = start {
                query.push(("start", start.to_string()));
            }
            if let Some(end) = end {
                query.push(("end", end.to_string()));
            }
            let history: HistoryResponse = client.get("/api/v1/meals/history", &query).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                print_history(&history.days);
            }
        }

        Commands::Search { query } => {
            let found: FoodSearchResponse = client
                .get("/api/v1/foods/search", &[("q", query)])
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else if found.results.is_empty() {
                println!("No foods match '{}'", found.query);
            } else {
                println!("{:<36} {:<30} {}", "ID", "Name", "Category");
                println!("{}", "-".repeat(80));
                for food in &found.results {
                    println!(
                        "{:<36} {:<30} {}",
                        food.id,
                        food.display_name, food.category
                    );
                }
            }
        }

        Commands::LogMeal {
            meal_type,
            food,
            portion,
            addon,
            date,
            calories,
            protein,
            carbs,
            fats,
        } => {
            let custom = calories.as_deref().map(|calories| CustomFoodForm {
                name: &food,
                portion_name: "",
                calories,
                protein: &protein,
                carbs: &carbs,
                fats: &fats,
            });
            let request = LogMealRequest {
                meal_type,
                food: &food,
                portion: portion.as_deref(),
                addons: &addon,
                date,
                today,
                custom,
            };
            let line = log_meal(&client, request).await?;
            println!(
                "Logged {} ({}) to {}: {:.0} kcal, P {:.1}g C {:.1}g F {:.1}g",
                line.food_name,
                line.portion_display,
                meal_type.label(),
                line.nutrition.calories,
                line.nutrition.protein_g,
                line.nutrition.carbs_g,
                line.nutrition.fats_g
            );
        }

        Commands::LogWeight {
            weight,
            date,
            notes,
        } => {
            let mut drawer = DrawerController::new();
            drawer.open(DrawerKind::ActionMenu, DrawerPayload::default());
            drawer.select_action(QuickAction::LogWeight, date)?;

            let input = parse_weight_form(&weight, date.unwrap_or(today), notes.as_deref())?;
            let log: WeightLog = client.send(Method::POST, "/api/v1/weight", &input).await?;

            println!("Logged {:.2} kg on {}", log.weight_kg, log.log_date);
            report_refresh(&drawer.finish_save()?);
        }

        Commands::SetGoals {
            calories,
            protein,
            carbs,
            fats,
            fiber,
            reason,
        } => {
            let input = GoalsForm {
                calories: &calories,
                protein: &protein,
                carbs: &carbs,
                fats: &fats,
                fiber: &fiber,
                reason: reason.as_deref(),
            }
            .parse()?;

            let current: Option<UserGoal> = client.get("/api/v1/goals/current", &[]).await?;
            let mut drawer = DrawerController::new();
            drawer.open_goals(current);

            let goal: UserGoal = client.send(Method::POST, "/api/v1/goals", &input).await?;
            println!("New goal from {}", goal.start_date);
            print_goal(Some(&goal));
            report_refresh(&drawer.finish_save()?);
        }

        Commands::Weight { limit } => {
            let list: WeightListResponse = client
                .get("/api/v1/weight", &[("limit", limit.to_string())])
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if list.logs.is_empty() {
                println!("No weight logged yet.");
            } else {
                println!("{:<12} {:>8}  {}", "Date", "kg", "Notes");
                println!("{}", "-".repeat(40));
                for log in &list.logs {
                    println!(
                        "{:<12} {:>8.2}  {}",
                        log.log_date,
                        log.weight_kg,
                        log.notes.as_deref().unwrap_or("")
                    );
                }
            }
        }

        Commands::Health => {
            let response = reqwest::get(format!("{}/api/health", client.base_url))
                .await
                .with_context(|| format!("cannot connect to Renshuu API at {}", cli.api_url))?;
            let status = response.status();
            let health: ApiHealthResponse = response.json().await?;

            println!("Renshuu v{}", env!("CARGO_PKG_VERSION"));
            println!("API Status: {} ({})", health.status, health.message);
            if let Some(error) = health.error {
                bail!("{} ({})", error, status);
            }
        }

        Commands::Config { output } => {
            let config = renshuu::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

struct LogMealRequest<'a> {
    meal_type: MealType,
    food: &'a str,
    portion: Option<&'a str>,
    addons: &'a [String],
    date: Option<NaiveDate>,
    today: NaiveDate,
    custom: Option<CustomFoodForm<'a>>,
}

/// action-menu → meal-type → food-search → (custom-food-form) → food-form → save
async fn log_meal(client: &ApiClient, req: LogMealRequest<'_>) -> anyhow::Result<MealFood> {
    let mut drawer = DrawerController::new();
    drawer.open(DrawerKind::ActionMenu, DrawerPayload::default());
    drawer.select_action(QuickAction::LogMeal, req.date)?;
    drawer.select_meal_type(req.meal_type, req.today)?;

    let found: FoodSearchResponse = client
        .get("/api/v1/foods/search", &[("q", req.food.to_string())])
        .await?;

    match (pick_food(&found.results, req.food), req.custom) {
        (Some(food), _) => drawer.select_food(&food.id, &food.display_name)?,
        (None, Some(form)) => {
            drawer.create_custom_food(req.food)?;
            let created: CustomFood = client
                .send(Method::POST, "/api/v1/foods/custom", &form.parse()?)
                .await?;
            println!("Created custom food '{}'", created.food.display_name);
            drawer.custom_food_created(&created.food.id, &created.food.display_name)?;
        }
        (None, None) => bail!(
            "no food matches '{}'; pass --calories (and optionally --protein/--carbs/--fats) to create it",
            req.food
        ),
    }

    let food_id = drawer
        .payload()
        .and_then(|p| p.food_id.clone())
        .ok_or_else(|| anyhow!("food form opened without a food"))?;
    let options: FoodOptions = client
        .get(&format!("/api/v1/foods/{}/options", food_id), &[])
        .await?;

    let mut picker = PortionPicker::new(options);
    if let Some(name) = req.portion {
        let id = picker
            .portions()
            .iter()
            .find(|p| p.display_name.eq_ignore_ascii_case(name))
            .map(|p| p.id.clone())
            .ok_or_else(|| anyhow!("no portion named '{}'", name))?;
        picker.select_portion(&id)?;
    }
    for name in req.addons {
        let id = picker
            .addons()
            .iter()
            .find(|a| a.display_name.eq_ignore_ascii_case(name))
            .map(|a| a.id.clone())
            .ok_or_else(|| anyhow!("no add-on named '{}'", name))?;
        picker.toggle_addon(&id)?;
    }

    let input = drawer.meal_food_input(&picker)?;
    let line: MealFood = client.send(Method::POST, "/api/v1/meal-foods", &input).await?;
    report_refresh(&drawer.finish_save()?);
    Ok(line)
}

/// Exact (case-insensitive) name match first, then the first result
fn pick_food<'a>(results: &'a [FoodSearchResult], name: &str) -> Option<&'a FoodSearchResult> {
    results
        .iter()
        .find(|f| f.display_name.eq_ignore_ascii_case(name.trim()))
        .or_else(|| results.first())
}

fn report_refresh(events: &[RefreshEvent]) {
    let names: Vec<&str> = events.iter().map(|e| e.as_str()).collect();
    tracing::debug!(events = ?names, "Views to refresh");
}

fn print_profile(profile: &Profile, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    println!("{} ({})", profile.full_name, profile.role.as_str());
    println!("  Height:   {}", or_dash(profile.height_cm.map(|h| format!("{} cm", h))));
    println!("  Age:      {}", or_dash(profile.age.map(|a| a.to_string())));
    println!("  Activity: {}", or_dash(profile.activity_level.clone()));
    Ok(())
}

fn print_day(date: NaiveDate, meals: &[MealWithFoods], summary: Option<&DailySummary>) {
    println!("{}", date.format("%A, %B %-d %Y"));
    println!();

    let groups = grouped_totals(meals);
    if groups.is_empty() {
        println!("No meals logged.");
    }
    for group in &groups {
        println!(
            "{:<10} {:>6.0} kcal  P {:>5.1}g  C {:>5.1}g  F {:>5.1}g",
            group.meal_type.label(),
            group.total_calories,
            group.total_protein,
            group.total_carbs,
            group.total_fats
        );
        for line in group.meals.iter().flat_map(|m| &m.meal_foods) {
            let addons = line
                .addons_display
                .as_ref()
                .filter(|a| !a.is_empty())
                .map(|a| format!(" + {}", a.join(", ")))
                .unwrap_or_default();
            println!(
                "  {} ({}){}: {:.0} kcal",
                line.food_name, line.portion_display, addons, line.nutrition.calories
            );
        }
    }

    if let Some(summary) = summary {
        println!();
        let target = summary
            .target_calories
            .map(|t| format!(" / {}", t))
            .unwrap_or_default();
        println!("Total: {:.0}{} kcal", summary.total_calories, target);
    }
}

fn print_goal(goal: Option<&UserGoal>) {
    match goal {
        Some(goal) => println!(
            "Goal: {} kcal, P {:.1}g C {:.1}g F {:.1}g, fiber {:.1}g",
            goal.daily_calorie,
            goal.daily_protein_g,
            goal.daily_carbs_g,
            goal.daily_fats_g,
            goal.daily_fiber_g
        ),
        None => println!("No goal set."),
    }
}

fn print_history(days: &[DayMeals]) {
    println!("{:<12} {:>6} {:>10}", "Date", "Meals", "kcal");
    println!("{}", "-".repeat(30));
    for day in days.iter().rev() {
        let meals = day.meals.iter().filter(|m| !m.meal_foods.is_empty()).count();
        let calories = day.summary.as_ref().map(|s| s.total_calories).unwrap_or(0.0);
        println!("{:<12} {:>6} {:>10.0}", day.date, meals, calories);
    }
}
