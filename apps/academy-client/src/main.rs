use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use academy_client::auth::GuardState;
use academy_client::config::Config;
use academy_client::models::session::{Role, Session};
use academy_client::notifications::NotificationSnapshot;
use academy_client::storage::{FileStorage, LocalStorage};
use academy_client::toast::ToastQueue;
use academy_client::views::{AdminDashboard, AuthFlow, Preset, StudentDashboard};
use academy_client::AppContext;

#[tokio::main]
async fn main() {
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run(Config::from_env()).await {
        tracing::error!(%err, "academy client stopped");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::open(&config.storage_dir).await?);
    let toasts = Arc::new(ToastQueue::new());
    // The terminal never deletes anything, so prompts are declined.
    let ctx = AppContext::new(config, storage, toasts.clone(), Arc::new(Preset(false)))?;

    let auth = AuthFlow::new(ctx.clone());
    if let Some(login) = ctx.config.login.clone() {
        if let Err(err) = auth.login(login.portal, &login.email, &login.password).await {
            print_toasts(&toasts);
            return Err(err.into());
        }
    }

    let guard = ctx.route_guard();
    // Guest-only entry view: a signed-in session is sent on to its dashboard.
    let nav = guard.follow("/").await;
    print_toasts(&toasts);
    let (route, session) = match (nav.state, nav.session) {
        (GuardState::Render(route), Some(session)) if session.is_authenticated => (route, session),
        (state, _) => {
            println!("not signed in ({state:?}); set ACADEMY_EMAIL and ACADEMY_PASSWORD");
            return Ok(());
        }
    };
    println!("== {route} ==");
    print_dashboard(&ctx, &session).await;

    let Some(user_id) = session.user_id.clone() else {
        return Err("verified session has no user id".into());
    };
    let center = ctx.notification_center();
    center.start(&user_id).await?;
    let mut snapshots = center.store().subscribe();

    println!("commands: [enter] open notifications, c clear, q quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            batch = toasts.next_batch() => {
                for toast in batch {
                    println!("{toast}");
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let unread = snapshots.borrow_and_update().unread;
                println!("({unread} unread)");
            }
            line = lines.next_line() => {
                match line?.as_deref().map(str::trim) {
                    None | Some("q") => break,
                    Some("c") => center.clear(),
                    Some(_) => match center.open_panel().await {
                        Ok(snapshot) => print_panel(&snapshot),
                        Err(err) => tracing::warn!(%err, "could not open notifications"),
                    },
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    center.stop();
    if let Some(role) = session.role {
        let _ = auth.logout(role).await;
    }
    print_toasts(&toasts);
    Ok(())
}

async fn print_dashboard(ctx: &AppContext, session: &Session) {
    match session.role {
        Some(Role::Admin) => {
            let dashboard = AdminDashboard::new(ctx.clone());
            if dashboard.load().await.is_ok() {
                let stats = dashboard.stats();
                println!(
                    "students: {} ({} suspended), courses: {} ({} suspended)",
                    stats.total_students, stats.suspended_students, stats.total_courses, stats.suspended_courses
                );
            }
        }
        Some(Role::Student) | None => {
            let dashboard = StudentDashboard::new(ctx.clone());
            if let Ok(state) = dashboard.load().await {
                for (subject, cards) in &state.by_subject {
                    println!("{subject}");
                    for card in cards {
                        let mark = if card.completed { "x" } else { " " };
                        println!("  [{mark}] {} ({:.0}%)", card.course.title, card.progress);
                    }
                }
                println!(
                    "{}/{} completed, average progress {:.0}%",
                    state.stats.completed_courses, state.stats.total_courses, state.stats.average_progress
                );
            }
        }
    }
}

fn print_panel(snapshot: &NotificationSnapshot) {
    if snapshot.items.is_empty() {
        println!("no notifications");
        return;
    }
    for item in &snapshot.items {
        let marker = if item.read { " " } else { "*" };
        println!("{marker} {} {}", item.timestamp.format("%Y-%m-%d %H:%M"), item.message);
    }
}

fn print_toasts(toasts: &ToastQueue) {
    for toast in toasts.drain() {
        println!("{toast}");
    }
}
