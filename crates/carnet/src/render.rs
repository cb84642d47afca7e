//! Text rendering of articles, comments and users.

use carnet_client::{Article, AuthorRef, Capabilities, Category, Comment, UserSummary};
use chrono::{DateTime, Datelike, Local, TimeZone, Utc};

const UNKNOWN_AUTHOR: &str = "Inconnu";
const NO_CATEGORY: &str = "Sans catégorie";
const UNKNOWN_DATE: &str = "date inconnue";

const MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

pub fn author_label(author: Option<&AuthorRef>) -> &str {
    author
        .and_then(|a| a.username.as_deref())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_AUTHOR)
}

pub fn category_label(category: Option<&Category>) -> &str {
    category.map(|c| c.name.as_str()).unwrap_or(NO_CATEGORY)
}

/// First letter of the username, uppercased, or `?`.
pub fn avatar_letter(username: Option<&str>) -> String {
    username
        .and_then(|name| name.chars().next())
        .map(|c| c.to_uppercase().collect::<String>())
        .unwrap_or_else(|| "?".to_string())
}

/// `5 mars 2025`
pub fn long_date<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    format!("{} {} {}", dt.day(), MONTHS[dt.month0() as usize], dt.year())
}

/// `05/03/2025`
pub fn short_date<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format("%d/%m/%Y").to_string()
}

/// `05/03/2025 14:03:00`
pub fn date_time<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format("%d/%m/%Y %H:%M:%S").to_string()
}

fn local(dt: Option<&DateTime<Utc>>) -> Option<DateTime<Local>> {
    dt.map(|d| d.with_timezone(&Local))
}

/// One entry of the article list.
pub fn article_item(article: &Article) -> String {
    let author = article.author.as_ref();
    let date = local(article.created_at.as_ref())
        .map(|d| long_date(&d))
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    format!(
        "[{}] {}  ({})\n    par {} • {} • {}",
        avatar_letter(author.and_then(|a| a.username.as_deref())),
        article.title,
        article.id,
        author_label(author),
        date,
        category_label(article.category.as_ref()),
    )
}

/// Moderation row of the admin article list.
pub fn admin_article_row(article: &Article) -> String {
    let date = local(article.created_at.as_ref())
        .map(|d| short_date(&d))
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    format!(
        "{}  {}\n    par {} — {} — {}",
        article.id,
        article.title,
        author_label(article.author.as_ref()),
        date,
        category_label(article.category.as_ref()),
    )
}

pub fn user_row(user: &UserSummary) -> String {
    let name = user.username.as_deref().unwrap_or("?");
    format!("[{}] {} ({})  {}", avatar_letter(Some(name)), name, user.role, user.id)
}

pub fn comment_item(comment: &Comment) -> String {
    let author = comment.author.as_ref();
    let name = author.and_then(|a| a.username.as_deref());
    let date = local(comment.created_at.as_ref())
        .map(|d| date_time(&d))
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    format!(
        "[{}] {}\n    {}\n    {}",
        avatar_letter(name),
        name.unwrap_or("?"),
        comment.content,
        date,
    )
}

/// Full article page: card, allowed actions and comments.
pub fn article_detail(article: &Article, caps: &Capabilities, comments: &[Comment]) -> String {
    let mut out = String::new();

    out.push_str(&article.title);
    out.push('\n');
    out.push_str(&format!("par {}\n", author_label(article.author.as_ref())));
    if let Some(category) = &article.category {
        out.push_str(&format!("Catégorie : {}\n", category.name));
    }
    out.push('\n');
    out.push_str(&article.content);
    out.push('\n');

    let mut actions = Vec::new();
    if caps.can_edit {
        actions.push("Modifier");
    }
    if caps.can_delete {
        actions.push("Supprimer");
    }
    if !actions.is_empty() {
        out.push_str(&format!("\nActions : {}\n", actions.join(", ")));
    }

    out.push_str("\nCommentaires\n");
    if comments.is_empty() {
        out.push_str("Aucun commentaire pour l’instant.\n");
    } else {
        for comment in comments {
            out.push_str(&comment_item(comment));
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(name: Option<&str>) -> AuthorRef {
        AuthorRef {
            id: "u1".to_string(),
            username: name.map(str::to_string),
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_labels() {
        assert_eq!(author_label(None), "Inconnu");
        assert_eq!(author_label(Some(&author(None))), "Inconnu");
        assert_eq!(author_label(Some(&author(Some("alice")))), "alice");
        assert_eq!(category_label(None), "Sans catégorie");
    }

    #[test]
    fn test_avatar_letter() {
        assert_eq!(avatar_letter(Some("alice")), "A");
        assert_eq!(avatar_letter(Some("élodie")), "É");
        assert_eq!(avatar_letter(Some("")), "?");
        assert_eq!(avatar_letter(None), "?");
    }

    #[test]
    fn test_french_dates() {
        let dt = at(2025, 3, 5, 14, 3);
        assert_eq!(long_date(&dt), "5 mars 2025");
        assert_eq!(short_date(&dt), "05/03/2025");
        assert_eq!(date_time(&dt), "05/03/2025 14:03:00");

        assert_eq!(long_date(&at(2024, 8, 31, 0, 0)), "31 août 2024");
    }

    #[test]
    fn test_article_detail_actions() {
        let article = Article {
            id: "a1".to_string(),
            title: "Bonjour".to_string(),
            content: "Texte".to_string(),
            author: Some(author(Some("alice"))),
            category: None,
            created_at: None,
        };

        let owner = Capabilities {
            can_edit: true,
            can_delete: true,
            can_view_admin_area: false,
        };
        let page = article_detail(&article, &owner, &[]);
        assert!(page.contains("par alice"));
        assert!(page.contains("Actions : Modifier, Supprimer"));
        assert!(page.contains("Aucun commentaire"));
        assert!(!page.contains("Catégorie"));

        let page = article_detail(&article, &Capabilities::default(), &[]);
        assert!(!page.contains("Actions"));
    }

    #[test]
    fn test_article_item_without_date() {
        let article = Article {
            id: "a9".to_string(),
            title: "Sans date".to_string(),
            content: String::new(),
            author: None,
            category: None,
            created_at: None,
        };

        let line = article_item(&article);
        assert!(line.starts_with("[?] Sans date"));
        assert!(line.contains("par Inconnu • date inconnue • Sans catégorie"));
    }
}
