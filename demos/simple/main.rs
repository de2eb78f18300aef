use std::sync::Arc;

use steamapi::{ApiArgs, ApiInterface, ConnectionConfig, InterfaceConfig, SteamUser};

pub fn main() -> steamapi::Result<()> {
    env_logger::init();

    let api_key = std::env::var("STEAM_API_KEY").unwrap_or_default();
    let connection = Arc::new(ConnectionConfig::from_api_key(api_key).to_connection()?);

    // Resource objects fetch lazily and cache per instance.
    let user = SteamUser::new(connection.clone(), 76561197960435530);
    println!("{} ({:?})", user.name()?, user.state()?);
    for friend in user.friends()?.iter().take(5) {
        // Summaries were precached along with the friend list.
        println!("  friend: {}", friend.name()?);
    }

    // The call tree reaches any API by name.
    let api = ApiInterface::new(connection, InterfaceConfig::default())?;
    let news = api
        .path("ISteamNews.GetNewsForApp.v0002")?
        .get(ApiArgs::new().arg("appid", 440u64).arg("count", 3u64))?;
    for item in news.object("appnews")?.objects("newsitems")? {
        println!("news: {}", item.str("title")?);
    }

    Ok(())
}
