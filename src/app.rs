use std::sync::Arc;

use crate::{
    cache::{CachedProperty, Cacheable, PropertyCache, INFINITE},
    ApiArgs, ApiConnection, Method, Result,
};

static NAME: CachedProperty<SteamApp, String> =
    CachedProperty::new("name", INFINITE, SteamApp::fetch_name);

/// A Steam application (usually a game).
pub struct SteamApp {
    connection: Arc<ApiConnection>,
    appid: u64,
    playtime_2weeks: Option<u64>,
    playtime_forever: Option<u64>,
    cache: PropertyCache,
}

impl SteamApp {
    /// Create an app. A known `name` is cached right away, saving a request.
    pub fn new(connection: Arc<ApiConnection>, appid: u64, name: Option<String>) -> SteamApp {
        let app = SteamApp {
            connection,
            appid,
            playtime_2weeks: None,
            playtime_forever: None,
            cache: PropertyCache::new(),
        };
        if let Some(name) = name {
            NAME.store(&app, name, None);
        }
        app
    }

    pub(crate) fn with_playtime(mut self, two_weeks: Option<u64>, forever: Option<u64>) -> Self {
        self.playtime_2weeks = two_weeks;
        self.playtime_forever = forever;
        self
    }

    /// Numeric app id.
    pub fn appid(&self) -> u64 {
        self.appid
    }

    /// Display name. Fetched from the game schema unless it was known at creation.
    pub fn name(&self) -> Result<String> {
        NAME.get(self)
    }

    /// Minutes played in the last two weeks, when the app came from a user's game list.
    pub fn playtime_2weeks(&self) -> Option<u64> {
        self.playtime_2weeks
    }

    /// Total minutes played, when the app came from a user's game list.
    pub fn playtime_forever(&self) -> Option<u64> {
        self.playtime_forever
    }

    fn fetch_name(&self) -> Result<String> {
        let response = self.connection.call_response(
            "ISteamUserStats",
            "GetSchemaForGame",
            "v2",
            Method::Get,
            ApiArgs::new().arg("appid", self.appid),
        )?;
        Ok(response.object("game")?.str("gameName")?.to_owned())
    }
}

impl Cacheable for SteamApp {
    fn property_cache(&self) -> &PropertyCache {
        &self.cache
    }
}

impl PartialEq for SteamApp {
    fn eq(&self, other: &Self) -> bool {
        self.appid == other.appid
    }
}

/// The appid, preceded by the quoted name once it is known.
impl std::fmt::Display for SteamApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match NAME.peek(self) {
            Some(name) => write!(f, "{:?} ({})", name, self.appid),
            None => write!(f, "{}", self.appid),
        }
    }
}

impl std::fmt::Debug for SteamApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteamApp")
            .field("appid", &self.appid)
            .field("playtime_2weeks", &self.playtime_2weeks)
            .field("playtime_forever", &self.playtime_forever)
            .finish()
    }
}
