mod render;

use anyhow::{bail, Context, Result};
use carnet_client::{
    can_publish, can_view_admin_area, navigation, ApiClient, Article, ArticleUpdate, Capabilities,
    ClientConfig, FileTokenStore, Identity, NewArticle, SessionManager, TokenStore, UserSummary,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "carnet")]
#[command(version, about = "Carnet blog client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (overrides CARNET_SERVER_URL)
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Print raw JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and keep the session token for later commands
    Login {
        #[arg(short, long)]
        email: String,

        /// Prompted when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// Prompted when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show the signed-in user and the available menu
    Whoami,
    /// Browse and write articles
    Articles {
        #[command(subcommand)]
        command: ArticleCommand,
    },
    /// List article categories
    Categories,
    /// Read and post comments
    Comments {
        #[command(subcommand)]
        command: CommentCommand,
    },
    /// Moderation (administrators only)
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand)]
enum ArticleCommand {
    /// List all articles
    List,
    /// Show an article with its comments
    Show { id: String },
    /// Publish a new article
    New {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        content: String,

        /// Category id
        #[arg(long)]
        category: Option<String>,
    },
    /// Edit one of your articles; omitted fields keep their current value
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,

        /// Category id
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete an article (author or administrator)
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CommentCommand {
    /// List comments of an article
    List { article_id: String },
    /// Comment on an article
    Add { article_id: String, content: String },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// List users
    Users,
    /// List articles for moderation
    Articles,
    /// Delete a user
    DeleteUser {
        id: String,

        #[arg(short, long)]
        yes: bool,
    },
    /// Delete any article
    DeleteArticle {
        id: String,

        #[arg(short, long)]
        yes: bool,
    },
}

/// Wired client: transport plus session.
struct App {
    api: Arc<ApiClient>,
    session: Arc<SessionManager>,
    json: bool,
}

#[derive(Serialize)]
struct ArticlePage<'a> {
    article: &'a Article,
    can_edit: bool,
    can_delete: bool,
    comments: &'a [carnet_client::Comment],
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,carnet=info,carnet_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("Failed to load configuration")?;
    if let Some(server_url) = cli.server_url {
        config = config.with_server_url(server_url);
    }
    tracing::debug!(server_url = %config.server_url, "Configuration loaded");

    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.data_dir()?));
    let api = Arc::new(ApiClient::new(&config, Arc::clone(&tokens)));
    let session = Arc::new(SessionManager::new(tokens, api.clone()));

    session.spawn_bootstrap();
    session.wait_ready().await;

    let app = App {
        api,
        session,
        json: cli.json,
    };

    if let Err(e) = app.run(cli.command).await {
        eprintln!("Erreur: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

impl App {
    async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Login { email, password } => {
                let password = match password {
                    Some(p) => p,
                    None => read_password()?,
                };
                let user = self.session.sign_in(&email, &password).await?;
                println!("Connecté en tant que {} ({})", user.username, user.role);
            }
            Commands::Register {
                username,
                email,
                password,
            } => {
                let password = match password {
                    Some(p) => p,
                    None => read_password()?,
                };
                self.api.register(&username, &email, &password).await?;
                println!("Compte créé. Connectez-vous avec 'carnet login --email {}'", email);
            }
            Commands::Logout => {
                self.session.logout().await?;
                println!("Déconnecté");
            }
            Commands::Whoami => self.whoami()?,
            Commands::Articles { command } => self.articles(command).await?,
            Commands::Categories => {
                let categories = self.api.list_categories().await?;
                if self.json {
                    return print_json(&categories);
                }
                for category in &categories {
                    println!("{}  {}", category.id, category.name);
                }
            }
            Commands::Comments { command } => self.comments(command).await?,
            Commands::Admin { command } => self.admin(command).await?,
        }
        Ok(())
    }

    fn user(&self) -> Option<Identity> {
        self.session.current_user()
    }

    fn whoami(&self) -> Result<()> {
        let user = self.user();
        if self.json {
            return print_json(&user);
        }
        match &user {
            Some(u) => println!("{} ({}) {}", u.username, u.role, u.id),
            None => println!("Non connecté"),
        }
        let menu: Vec<&str> = navigation(user.as_ref()).into_iter().map(|i| i.label()).collect();
        println!("Menu : {}", menu.join(" | "));
        Ok(())
    }

    async fn articles(&self, command: ArticleCommand) -> Result<()> {
        match command {
            ArticleCommand::List => {
                let articles = self.api.list_articles().await?;
                if self.json {
                    return print_json(&articles);
                }
                if articles.is_empty() {
                    println!("Aucun article.");
                }
                for article in &articles {
                    println!("{}", render::article_item(article));
                }
            }
            ArticleCommand::Show { id } => {
                let article = self.api.get_article(&id).await?;
                let comments = self.api.list_comments(&id).await?;
                let user = self.user();
                let caps = Capabilities::resolve(user.as_ref(), &article);
                if self.json {
                    return print_json(&ArticlePage {
                        article: &article,
                        can_edit: caps.can_edit,
                        can_delete: caps.can_delete,
                        comments: &comments,
                    });
                }
                print!("{}", render::article_detail(&article, &caps, &comments));
            }
            ArticleCommand::New {
                title,
                content,
                category,
            } => {
                if !can_publish(self.user().as_ref()) {
                    bail!("Connectez-vous pour publier un article");
                }
                let body = NewArticle {
                    title,
                    content,
                    category: category.unwrap_or_default(),
                };
                self.api.create_article(&body).await?;
                println!("Article publié");
            }
            ArticleCommand::Edit {
                id,
                title,
                content,
                category,
            } => {
                let article = self.api.get_article(&id).await?;
                let caps = Capabilities::resolve(self.user().as_ref(), &article);
                if !caps.can_edit {
                    bail!("Seul l'auteur peut modifier cet article");
                }
                let body = edit_body(article, title, content, category);
                self.api.update_article(&id, &body).await?;
                println!("Article modifié");
            }
            ArticleCommand::Delete { id, yes } => {
                let article = self.api.get_article(&id).await?;
                let caps = Capabilities::resolve(self.user().as_ref(), &article);
                if !caps.can_delete {
                    bail!("Vous ne pouvez pas supprimer cet article");
                }
                if !yes && !confirm(&delete_article_question(&article))? {
                    return Ok(());
                }
                self.api.delete_article(&id).await?;
                println!("Article supprimé");
            }
        }
        Ok(())
    }

    async fn comments(&self, command: CommentCommand) -> Result<()> {
        match command {
            CommentCommand::List { article_id } => {
                let comments = self.api.list_comments(&article_id).await?;
                if self.json {
                    return print_json(&comments);
                }
                if comments.is_empty() {
                    println!("Aucun commentaire pour l’instant.");
                }
                for comment in &comments {
                    println!("{}", render::comment_item(comment));
                }
            }
            CommentCommand::Add { article_id, content } => {
                if !can_publish(self.user().as_ref()) {
                    bail!("Connectez-vous pour commenter");
                }
                if content.trim().is_empty() {
                    return Ok(());
                }
                self.api.add_comment(&article_id, &content).await?;
                println!("Commentaire envoyé");
            }
        }
        Ok(())
    }

    async fn admin(&self, command: AdminCommand) -> Result<()> {
        if !can_view_admin_area(self.user().as_ref()) {
            bail!("Accès réservé aux administrateurs");
        }

        match command {
            AdminCommand::Users => {
                let users = self.api.list_users().await?;
                if self.json {
                    return print_json(&users);
                }
                for user in &users {
                    println!("{}", render::user_row(user));
                }
            }
            AdminCommand::Articles => {
                let articles = self.api.list_articles().await?;
                if self.json {
                    return print_json(&articles);
                }
                for article in &articles {
                    println!("{}", render::admin_article_row(article));
                }
            }
            AdminCommand::DeleteUser { id, yes } => {
                if !yes {
                    let users = self.api.list_users().await?;
                    if !confirm(&delete_user_question(&users, &id)?)? {
                        return Ok(());
                    }
                }
                self.api.delete_user(&id).await?;
                println!("Utilisateur supprimé");
            }
            AdminCommand::DeleteArticle { id, yes } => {
                if !yes {
                    let article = self.api.get_article(&id).await?;
                    if !confirm(&delete_article_question(&article))? {
                        return Ok(());
                    }
                }
                self.api.delete_article(&id).await?;
                println!("Article supprimé");
            }
        }
        Ok(())
    }
}

/// Update body for `articles edit`: omitted fields keep the article's values.
fn edit_body(
    article: Article,
    title: Option<String>,
    content: Option<String>,
    category: Option<String>,
) -> ArticleUpdate {
    ArticleUpdate::new(
        title.unwrap_or(article.title),
        content.unwrap_or(article.content),
        category.or_else(|| article.category.map(|c| c.id)),
    )
}

fn delete_user_question(users: &[UserSummary], id: &str) -> Result<String> {
    let Some(user) = users.iter().find(|u| u.id == id) else {
        bail!("Utilisateur introuvable : {}", id);
    };
    let name = user.username.as_deref().unwrap_or(&user.id);
    Ok(format!("Supprimer l'utilisateur \"{}\" ?", name))
}

fn delete_article_question(article: &Article) -> String {
    format!("Supprimer l'article \"{}\" ?", article.title)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_password() -> Result<String> {
    rpassword::read_password_from_tty(Some("Mot de passe : ")).context("Failed to read password")
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [o/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "o" | "oui" | "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_article_edit() {
        let cli = Cli::try_parse_from(["carnet", "articles", "edit", "a1", "--title", "Nouveau"]).unwrap();
        match cli.command {
            Commands::Articles {
                command: ArticleCommand::Edit { id, title, content, .. },
            } => {
                assert_eq!(id, "a1");
                assert_eq!(title.as_deref(), Some("Nouveau"));
                assert!(content.is_none());
            }
            _ => panic!("expected articles edit"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["carnet", "whoami", "--json", "--server-url", "http://x:4000"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.server_url.as_deref(), Some("http://x:4000"));
    }

    fn article(category: Option<&str>) -> Article {
        serde_json::from_value(serde_json::json!({
            "_id": "a1",
            "title": "Ancien titre",
            "content": "Ancien texte",
            "category": category.map(|id| serde_json::json!({"_id": id, "name": "Actualités"})),
        }))
        .unwrap()
    }

    #[test]
    fn test_edit_uncategorised_article_sends_null() {
        let body = edit_body(article(None), Some("t".to_string()), None, None);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"title": "t", "content": "Ancien texte", "category": null})
        );
    }

    #[test]
    fn test_edit_keeps_current_category() {
        let body = edit_body(article(Some("c1")), None, None, None);
        assert_eq!(body.title, "Ancien titre");
        assert_eq!(body.category.as_deref(), Some("c1"));

        let body = edit_body(article(Some("c1")), None, None, Some("c2".to_string()));
        assert_eq!(body.category.as_deref(), Some("c2"));
    }

    #[test]
    fn test_delete_questions_name_the_record() {
        assert_eq!(
            delete_article_question(&article(None)),
            "Supprimer l'article \"Ancien titre\" ?"
        );

        let users: Vec<UserSummary> = serde_json::from_value(serde_json::json!([
            {"_id": "u1", "username": "alice", "role": "user"},
            {"_id": "u2", "role": "admin"}
        ]))
        .unwrap();
        assert_eq!(
            delete_user_question(&users, "u1").unwrap(),
            "Supprimer l'utilisateur \"alice\" ?"
        );
        assert_eq!(
            delete_user_question(&users, "u2").unwrap(),
            "Supprimer l'utilisateur \"u2\" ?"
        );
        assert!(delete_user_question(&users, "u9").is_err());
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("o\n"));
        assert!(is_yes("Oui"));
        assert!(!is_yes(""));
        assert!(!is_yes("non"));
    }
}
