use campusdesk_cli::seeder::{self, ClassLayout, SeedConfig};
use campusdesk_enrollment::OrganizationScope;
use campusdesk_models::ids::{ClassId, OrganizationId};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use dotenvy::dotenv;

#[derive(Parser)]
#[command(name = "campusdesk-cli")]
#[command(about = "Campusdesk CLI - Seeding and enrollment maintenance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the database with organizations, classes, sections, teachers and enrolled students
    Seed {
        /// Number of organizations to create
        #[arg(short = 'o', long, default_value = "3")]
        organizations: usize,

        /// Number of classes per organization
        #[arg(long, default_value = "6")]
        classes: usize,

        /// Number of sections per class (at most 26)
        #[arg(long, default_value = "3")]
        sections: usize,

        /// Seats per section
        #[arg(long, default_value = "30")]
        capacity: i32,

        /// Number of teachers per organization
        #[arg(long, default_value = "5")]
        teachers: usize,

        /// Number of students to enroll per class
        #[arg(long, default_value = "75")]
        students: usize,
    },
    /// Clear all seeded data (keeps system admins)
    ClearSeed,
    /// Recompute cached counters and prune stale section memberships
    Reconcile {
        /// Limit the pass to one organization
        #[arg(long)]
        organization: Option<OrganizationId>,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Show per-section occupancy of a class
    Capacity {
        /// Class to report on
        #[arg(long)]
        class: ClassId,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let pool = match campusdesk_db::init_db_pool(5).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            std::process::exit(1);
        }
    };

    let cli = Cli::parse();

    match cli.command {
        Commands::Seed {
            organizations,
            classes,
            sections,
            capacity,
            teachers,
            students,
        } => {
            let config = SeedConfig::new(organizations)
                .with_teachers(teachers)
                .with_layout(ClassLayout {
                    classes_per_organization: classes,
                    sections_per_class: sections,
                    section_capacity: capacity,
                    students_per_class: students,
                });
            handle_seed(&pool, config).await
        }
        Commands::ClearSeed => handle_clear_seed(&pool).await,
        Commands::Reconcile { organization, yes } => {
            handle_reconcile(&pool, organization, yes).await
        }
        Commands::Capacity { class } => handle_capacity(&pool, class).await,
    }
}

async fn handle_seed(pool: &sqlx::postgres::PgPool, config: SeedConfig) {
    if !(1..=50).contains(&config.layout.section_capacity) {
        eprintln!("❌ --capacity must be between 1 and 50");
        std::process::exit(1);
    }

    if let Err(e) = seeder::seed_all(pool, config).await {
        eprintln!("\n❌ Error seeding database: {}", e);
        std::process::exit(1);
    }
}

async fn handle_clear_seed(pool: &sqlx::postgres::PgPool) {
    if let Err(e) = seeder::clear_all(pool).await {
        eprintln!("\n❌ Error clearing seeded data: {}", e);
        std::process::exit(1);
    }
}

async fn handle_reconcile(
    pool: &sqlx::postgres::PgPool,
    organization: Option<OrganizationId>,
    yes: bool,
) {
    let target = match organization {
        Some(id) => format!("organization {}", id),
        None => "every organization".to_string(),
    };

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Reconcile counters for {}?", target))
            .default(true)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            println!("Aborted");
            return;
        }
    }

    let engine = seeder::engine(pool);
    let result = match organization {
        Some(id) => engine.reconciler.reconcile_organization(id).await,
        None => engine.reconciler.reconcile_all().await,
    };

    match result {
        Ok(report) => {
            println!("✅ Reconciled {}", target);
            println!("   Organizations: {}", report.organizations);
            println!("   Classes:       {}", report.classes);
            println!("   Sections:      {}", report.sections);
            println!("   Drift healed:  {}", report.drift_detected);
            println!("   Pruned:        {}", report.members_pruned);
            println!("   Repaired:      {}", report.students_repaired);
            println!("   Orphans:       {}", report.orphans_removed);
        }
        Err(e) => {
            eprintln!("\n❌ Error reconciling: {}", e);
            std::process::exit(1);
        }
    }
}

async fn handle_capacity(pool: &sqlx::postgres::PgPool, class: ClassId) {
    let engine = seeder::engine(pool);
    match engine
        .enrollments
        .capacity_summary(OrganizationScope::Any, class)
        .await
    {
        Ok(summary) => {
            println!("{} {} ({})", summary.grade, summary.name, summary.class_id);
            println!(
                "{:<8} {:>8} {:>8} {:>10}",
                "Section", "Max", "Enrolled", "Available"
            );
            for section in &summary.sections {
                println!(
                    "{:<8} {:>8} {:>8} {:>10}",
                    section.name,
                    section.max_students,
                    section.current_student_count,
                    section.available_seats
                );
            }
            println!(
                "{:<8} {:>8} {:>8} {:>10}",
                "Total", summary.total_capacity, summary.total_enrolled, summary.total_available
            );
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}
