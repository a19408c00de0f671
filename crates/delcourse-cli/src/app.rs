//! Command dispatch: builds the client stack once per invocation and runs
//! one subcommand against it.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, warn};

use delcourse_core::api::{ApiClient, ApiError, CourseScope, CoverImage, Operation};
use delcourse_core::auth::{
    FileCredentialStore, KeyringCredentialStore, SessionHandle, SessionStatus, SessionStore,
};
use delcourse_core::models::{
    ContentDraft, ContentId, Course, CourseDraft, CourseId, Created, Registration, User,
};
use delcourse_core::utils::contains_ignore_case;
use delcourse_core::{Config, DashboardSummary, EnrollmentBook, SortOrder, UserDirectory};

use crate::render;
use crate::{Commands, ContentCommands, CourseCommands};

const LOGIN_HINT: &str = "Not logged in. Run `delcourse login` first.";
const SESSION_EXPIRED_HINT: &str = "Your session has expired. Run `delcourse login` again.";

pub struct App {
    config: Config,
    asset_origin: String,
    api: Arc<ApiClient>,
    sessions: SessionStore<ApiClient>,
    enrollment: EnrollmentBook<ApiClient>,
}

impl App {
    pub fn new(api_base: Option<&str>, use_keyring: bool) -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let handle = if use_keyring {
            debug!("Using OS keychain for the session");
            SessionHandle::new(KeyringCredentialStore::new())
        } else {
            let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
            debug!(?cache_dir, "Cache directory configured");
            SessionHandle::new(FileCredentialStore::new(&cache_dir))
        };

        let base = config.api_base(api_base);
        debug!(api_base = %base, "API base configured");
        let api = Arc::new(ApiClient::new(&base, handle.clone())?);

        Ok(Self {
            asset_origin: config.asset_origin(api_base),
            enrollment: EnrollmentBook::with_session(api.clone(), &handle),
            sessions: SessionStore::new(handle, api.clone()),
            api,
            config,
        })
    }

    pub async fn hydrate(&self) -> SessionStatus {
        self.sessions.hydrate().await
    }

    pub async fn run(mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login { email } => self.login(email).await,
            Commands::Register { name, email } => self.register(name, email).await,
            Commands::Logout => {
                self.sessions.logout();
                println!("Logged out.");
                Ok(())
            }
            protected => {
                self.require_login()?;
                self.run_protected(protected).await
            }
        }
    }

    async fn run_protected(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Whoami => self.whoami().await,
            Commands::Dashboard => {
                let summary = DashboardSummary::load(&self.api)
                    .await
                    .map_err(fail(Operation::LoadDashboard))?;
                render::print_dashboard(&summary);
                Ok(())
            }
            Commands::Users { search, desc } => self.users(search, desc).await,
            Commands::Courses { mine, search } => self.courses(mine, search).await,
            Commands::Course(cmd) => self.course(cmd).await,
            Commands::Join { id } => {
                self.enrollment.refresh(id).await.map_err(fail(Operation::LoadCourse))?;
                println!("{}", self.enrollment.join(id).await?);
                Ok(())
            }
            Commands::Leave { id, yes } => {
                if !yes {
                    bail!("Leaving removes your progress. Re-run with --yes to leave course {}.", id);
                }
                self.enrollment.refresh(id).await.map_err(fail(Operation::LoadCourse))?;
                println!("{}", self.enrollment.leave(id).await?);
                Ok(())
            }
            Commands::Rate { id, stars, comment } => {
                self.enrollment.refresh(id).await.map_err(fail(Operation::LoadCourse))?;
                let receipt = self.enrollment.rate(id, stars, comment.as_deref()).await?;
                if let Some(message) = receipt.message {
                    println!("{}", message);
                }
                if let Some(average) = receipt.average_rating {
                    println!("New average: {:.1}", average);
                }
                Ok(())
            }
            Commands::Content(cmd) => self.content(cmd).await,
            Commands::Login { .. } | Commands::Register { .. } | Commands::Logout => Ok(()),
        }
    }

    fn require_login(&self) -> Result<()> {
        if self.sessions.snapshot().is_authenticated() {
            Ok(())
        } else {
            Err(anyhow!(LOGIN_HINT))
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email {
            Some(email) => email,
            None => prompt_with_default("Email", self.config.last_email.as_deref())?,
        };
        let password = rpassword::prompt_password("Password: ")?;
        if email.trim().is_empty() || password.is_empty() {
            bail!("Email and password required");
        }

        let session = self
            .sessions
            .login(email.trim(), &password)
            .await
            .map_err(fail(Operation::Login))?;

        self.config.last_email = Some(email.trim().to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        match session.user().filter(|u| !u.is_provisional()) {
            Some(user) => println!("Logged in as {}.", user.display_name()),
            None => println!("Logged in."),
        }
        Ok(())
    }

    async fn register(&self, name: Option<String>, email: Option<String>) -> Result<()> {
        let name = match name {
            Some(name) => name,
            None => prompt("Name")?,
        };
        let email = match email {
            Some(email) => email,
            None => prompt("Email")?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        let registration = Registration {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password,
        };
        let message = self
            .sessions
            .register(&registration)
            .await
            .map_err(fail(Operation::Register))?;
        println!(
            "{}",
            message.unwrap_or_else(|| "Account created. Run `delcourse login` to sign in.".to_string())
        );
        Ok(())
    }

    async fn whoami(&self) -> Result<()> {
        let session = self.sessions.snapshot();
        let user = if session.profile_is_provisional() {
            self.sessions
                .refresh_profile()
                .await
                .context("Failed to load your profile")?
        } else {
            session.require_user()?.clone()
        };
        print_profile(&user);
        Ok(())
    }

    // =========================================================================
    // Listing
    // =========================================================================

    async fn users(&self, search: Option<String>, desc: bool) -> Result<()> {
        let users = self.api.list_users().await.map_err(fail(Operation::LoadUsers))?;
        let mut directory = UserDirectory::new(users);
        directory.search_query = search.unwrap_or_default();
        directory.order = if desc { SortOrder::Descending } else { SortOrder::Ascending };
        render::print_users(&directory.visible());
        Ok(())
    }

    async fn courses(&self, mine: bool, search: Option<String>) -> Result<()> {
        let scope = if mine { CourseScope::Mine } else { CourseScope::All };
        let mut courses = self
            .api
            .list_courses(scope)
            .await
            .map_err(fail(Operation::LoadCourses))?;

        let query = search.unwrap_or_default().trim().to_lowercase();
        if !query.is_empty() {
            courses.retain(|c| contains_ignore_case(c.title(), &query));
        }
        render::print_courses(&courses);
        Ok(())
    }

    // =========================================================================
    // Courses
    // =========================================================================

    async fn course(&self, command: CourseCommands) -> Result<()> {
        match command {
            CourseCommands::Show { id } => {
                let course = self
                    .enrollment
                    .refresh(id)
                    .await
                    .map_err(fail(Operation::LoadCourse))?;
                self.show_course(id, &course);
            }
            CourseCommands::Create { title, description, cover } => {
                let cover = cover.as_deref().map(CoverImage::from_path).transpose()?;
                let draft = CourseDraft { title, description };
                let created = self
                    .api
                    .create_course(&draft, cover)
                    .await
                    .map_err(fail(Operation::SaveCourse))?;
                print_created(&created, "Course created.");
            }
            CourseCommands::Update { id, title, description } => {
                let draft = CourseDraft { title, description };
                let message = self
                    .api
                    .update_course(id, &draft)
                    .await
                    .map_err(fail(Operation::SaveCourse))?;
                println!("{}", message.unwrap_or_else(|| "Course updated.".to_string()));
            }
            CourseCommands::Delete { id, yes } => {
                if !yes {
                    bail!("Re-run with --yes to delete course {}.", id);
                }
                let message = self
                    .api
                    .delete_course(id)
                    .await
                    .map_err(fail(Operation::DeleteCourse))?;
                println!("{}", message.unwrap_or_else(|| "Course deleted.".to_string()));
            }
            CourseCommands::Cover { id, path } => {
                let cover = CoverImage::from_path(&path)?;
                let message = self
                    .api
                    .change_cover(id, cover)
                    .await
                    .map_err(fail(Operation::SaveCourse))?;
                println!("{}", message.unwrap_or_else(|| "Cover updated.".to_string()));
            }
        }
        Ok(())
    }

    fn show_course(&self, id: CourseId, course: &Course) {
        let state = self.enrollment.snapshot(id);
        render::print_course_detail(course, &state, &self.asset_origin);
    }

    // =========================================================================
    // Contents
    // =========================================================================

    async fn content(&self, command: ContentCommands) -> Result<()> {
        match command {
            ContentCommands::Add { course_id, title, youtube } => {
                let draft = ContentDraft { title, youtube };
                let created = self
                    .api
                    .add_content(course_id, &draft)
                    .await
                    .map_err(fail(Operation::SaveContent))?;
                print_created(&created, "Lesson added.");
            }
            ContentCommands::Show { id } => {
                let content = self
                    .api
                    .get_content(id)
                    .await
                    .map_err(fail(Operation::LoadContent))?;
                println!("{}", render::content_line(&content));
            }
            ContentCommands::Update { id, title, youtube } => {
                let draft = ContentDraft { title, youtube };
                let message = self
                    .api
                    .update_content(id, &draft)
                    .await
                    .map_err(fail(Operation::SaveContent))?;
                println!("{}", message.unwrap_or_else(|| "Lesson updated.".to_string()));
            }
            ContentCommands::Delete { id, yes } => {
                if !yes {
                    bail!("Re-run with --yes to delete lesson {}.", id);
                }
                let message = self
                    .api
                    .delete_content(id)
                    .await
                    .map_err(fail(Operation::DeleteContent))?;
                println!("{}", message.unwrap_or_else(|| "Lesson deleted.".to_string()));
            }
            ContentCommands::Done { id } => self.set_finished(id, true).await?,
            ContentCommands::Undone { id } => self.set_finished(id, false).await?,
        }
        Ok(())
    }

    async fn set_finished(&self, id: ContentId, finished: bool) -> Result<()> {
        let message = self
            .api
            .set_content_finished(id, finished)
            .await
            .map_err(fail(Operation::ContentStatus))?;
        let fallback = if finished {
            "Lesson marked as finished."
        } else {
            "Lesson marked as not finished."
        };
        println!("{}", message.unwrap_or_else(|| fallback.to_string()));
        Ok(())
    }
}

/// Turn an API error into the message shown for `operation`.
fn fail(operation: Operation) -> impl Fn(ApiError) -> anyhow::Error {
    move |err| {
        debug!(error = %err, ?operation, "Request failed");
        if err.is_unauthorized() && !matches!(operation, Operation::Login) {
            anyhow!(SESSION_EXPIRED_HINT)
        } else {
            anyhow!(err.user_message(operation))
        }
    }
}

fn print_profile(user: &User) {
    println!("{}", user.display_name());
    println!("Email:  {}", user.email);
    println!("Id:     {}", user.id);
}

fn print_created(created: &Created, fallback: &str) {
    println!("{}", created.message.as_deref().unwrap_or(fallback));
    if let Some(id) = created.id {
        println!("Id: {}", id);
    }
}

fn prompt(label: &str) -> Result<String> {
    prompt_with_default(label, None)
}

fn prompt_with_default(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) => print!("{} [{}]: ", label, value),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match default {
        Some(value) if input.is_empty() => value.to_string(),
        _ => input.to_string(),
    })
}
