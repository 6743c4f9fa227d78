//! List users command handler

use crate::config::Config;
use crate::db::Store;
use crate::domain::Role;

pub async fn cmd_list_users(config: &Config, role: Option<Role>) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_url).await?;
    let users = match role {
        Some(role) => store.list_users_by_role(role).await?,
        None => store.list_users().await?,
    };

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        let marker = match user.role {
            Role::Admin => "★",
            Role::Pending => "…",
            Role::User => "•",
        };

        println!("{} {} <{}> [{}]", marker, user.username, user.email, user.role);
        println!("  ID: {} | Registered: {}", user.id, user.created_at);
    }

    println!();
    println!("Legend: ★ Admin | … Pending approval | • User");

    Ok(())
}
