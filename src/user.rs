use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    app::SteamApp,
    cache::{hours, minutes, CachedProperty, Cacheable, PropertyCache, INFINITE},
    config::PRECACHE_CHUNK_SIZE,
    consts::{CommunityVisibilityState, OnlineState},
    ApiArgs, ApiConnection, ApiResponse, Error, Method, Result,
};

static SUMMARY: CachedProperty<SteamUser, ApiResponse> =
    CachedProperty::new("summary", hours(2), SteamUser::fetch_summary);
static BANS: CachedProperty<SteamUser, ApiResponse> =
    CachedProperty::new("bans", INFINITE, SteamUser::fetch_bans);
static BADGE_DATA: CachedProperty<SteamUser, ApiResponse> =
    CachedProperty::new("badge_data", minutes(30), SteamUser::fetch_badge_data);

static NAME: CachedProperty<SteamUser, String> = CachedProperty::new("name", INFINITE, |user| {
    Ok(user.summary()?.str("personaname")?.to_owned())
});
static REAL_NAME: CachedProperty<SteamUser, Option<String>> =
    CachedProperty::new("real_name", INFINITE, |user| {
        optional_str(&user.summary()?, "realname")
    });
static COUNTRY_CODE: CachedProperty<SteamUser, Option<String>> =
    CachedProperty::new("country_code", INFINITE, |user| {
        optional_str(&user.summary()?, "loccountrycode")
    });
static CURRENTLY_PLAYING: CachedProperty<SteamUser, Option<Arc<SteamApp>>> =
    CachedProperty::new("currently_playing", minutes(10), SteamUser::fetch_currently_playing);
static TIME_CREATED: CachedProperty<SteamUser, DateTime<Utc>> =
    CachedProperty::new("time_created", INFINITE, |user| {
        timestamp(&user.summary()?, "timecreated")
    });
static PROFILE_URL: CachedProperty<SteamUser, String> =
    CachedProperty::new("profile_url", INFINITE, |user| {
        Ok(user.summary()?.str("profileurl")?.to_owned())
    });
static GROUPS: CachedProperty<SteamUser, Vec<SteamGroup>> =
    CachedProperty::new("groups", hours(1), SteamUser::fetch_groups);
static GROUP: CachedProperty<SteamUser, SteamGroup> = CachedProperty::new("group", hours(1), |user| {
    Ok(SteamGroup::new(user.summary()?.u64("primaryclanid")?))
});
static FRIENDS: CachedProperty<SteamUser, Vec<Arc<SteamUser>>> =
    CachedProperty::new("friends", hours(1), SteamUser::fetch_friends);
static RECENTLY_PLAYED: CachedProperty<SteamUser, Vec<Arc<SteamApp>>> =
    CachedProperty::new("recently_played", INFINITE, SteamUser::fetch_recently_played);
static GAMES: CachedProperty<SteamUser, Vec<Arc<SteamApp>>> =
    CachedProperty::new("games", INFINITE, SteamUser::fetch_games);
static IS_VAC_BANNED: CachedProperty<SteamUser, bool> =
    CachedProperty::new("is_vac_banned", INFINITE, |user| user.bans()?.bool("VACBanned"));
static IS_COMMUNITY_BANNED: CachedProperty<SteamUser, bool> =
    CachedProperty::new("is_community_banned", INFINITE, |user| {
        user.bans()?.bool("CommunityBanned")
    });

fn optional_str(response: &ApiResponse, name: &str) -> Result<Option<String>> {
    Ok(response
        .get(name)
        .and_then(|value| value.as_str())
        .map(str::to_owned))
}

fn timestamp(response: &ApiResponse, name: &str) -> Result<DateTime<Utc>> {
    let seconds = response.i64(name)?;
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| Error::UnexpectedType {
        name: name.to_owned(),
        expected: "a unix timestamp",
    })
}

/// A list field that the API omits when it would be empty.
fn objects_or_empty<'a>(response: &'a ApiResponse, name: &str) -> Result<Vec<&'a ApiResponse>> {
    if response.contains(name) {
        response.objects(name)
    } else {
        Ok(Vec::new())
    }
}

/// A Steam Community group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SteamGroup {
    guid: u64,
}

impl SteamGroup {
    /// Group with the 64-bit id `guid`.
    pub fn new(guid: u64) -> Self {
        SteamGroup { guid }
    }

    /// 64-bit group id.
    pub fn guid(&self) -> u64 {
        self.guid
    }
}

/// A badge earned by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct SteamUserBadge {
    /// Badge type.
    pub badge_id: u64,
    /// Badge level.
    pub level: u64,
    /// When the current level was reached.
    pub completion_time: DateTime<Utc>,
    /// Experience granted by the badge.
    pub xp: u64,
    /// Number of users holding this badge.
    pub scarcity: u64,
    /// Set for game badges.
    pub appid: Option<u64>,
}

impl SteamUserBadge {
    fn from_response(badge: &ApiResponse) -> Result<Self> {
        Ok(SteamUserBadge {
            badge_id: badge.u64("badgeid")?,
            level: badge.u64("level")?,
            completion_time: timestamp(badge, "completion_time")?,
            xp: badge.u64("xp")?,
            scarcity: badge.u64("scarcity")?,
            appid: badge.get("appid").and_then(|value| value.as_u64()),
        })
    }
}

/// A Steam user, identified by a 64-bit SteamID.
///
/// Every accessor fetches what it needs on first use and caches it on the instance. Most values
/// come from the player summary, which is cached for two hours.
pub struct SteamUser {
    connection: Arc<ApiConnection>,
    steamid: u64,
    friend_since: Option<DateTime<Utc>>,
    cache: PropertyCache,
}

impl SteamUser {
    /// User with the given SteamID. Nothing is fetched until an accessor needs it.
    pub fn new(connection: Arc<ApiConnection>, steamid: u64) -> SteamUser {
        SteamUser {
            connection,
            steamid,
            friend_since: None,
            cache: PropertyCache::new(),
        }
    }

    /// Look up a user by the custom part of their profile URL.
    pub fn from_vanity_url(connection: Arc<ApiConnection>, vanity_url: &str) -> Result<SteamUser> {
        let response = connection.call_response(
            "ISteamUser",
            "ResolveVanityURL",
            "v0001",
            Method::Get,
            ApiArgs::new().arg("vanityurl", vanity_url),
        )?;

        if response.contains("success") && !response.bool("success").unwrap_or(false) {
            log::debug!(target: "steamapi", vanity_url = vanity_url; "vanity URL did not resolve");
            return Err(Error::UserNotFound);
        }

        let steamid = response.u64("steamid")?;
        Ok(SteamUser::new(connection, steamid))
    }

    /// 64-bit SteamID.
    pub fn steamid(&self) -> u64 {
        self.steamid
    }

    /// When this user became a friend, for users listed by [`SteamUser::friends`].
    pub fn friend_since(&self) -> Option<DateTime<Utc>> {
        self.friend_since
    }

    fn summary(&self) -> Result<ApiResponse> {
        SUMMARY.get(self)
    }

    fn bans(&self) -> Result<ApiResponse> {
        BANS.get(self)
    }

    fn badge_data(&self) -> Result<ApiResponse> {
        BADGE_DATA.get(self)
    }

    /// Persona name.
    pub fn name(&self) -> Result<String> {
        NAME.get(self)
    }

    /// Real name, if the user has set one and it is visible.
    pub fn real_name(&self) -> Result<Option<String>> {
        REAL_NAME.get(self)
    }

    /// ISO 3166 country code, if set and visible.
    pub fn country_code(&self) -> Result<Option<String>> {
        COUNTRY_CODE.get(self)
    }

    /// The game the user is in right now.
    pub fn currently_playing(&self) -> Result<Option<Arc<SteamApp>>> {
        CURRENTLY_PLAYING.get(self)
    }

    /// Profile visibility.
    pub fn privacy(&self) -> Result<CommunityVisibilityState> {
        let code = self.summary()?.u64("communityvisibilitystate")?;
        CommunityVisibilityState::from_code(code).ok_or_else(|| Error::UnexpectedType {
            name: "communityvisibilitystate".to_owned(),
            expected: "a visibility state",
        })
    }

    /// When the user was last online.
    pub fn last_logoff(&self) -> Result<DateTime<Utc>> {
        timestamp(&self.summary()?, "lastlogoff")
    }

    /// Account creation time.
    pub fn time_created(&self) -> Result<DateTime<Utc>> {
        TIME_CREATED.get(self)
    }

    /// Community profile URL.
    pub fn profile_url(&self) -> Result<String> {
        PROFILE_URL.get(self)
    }

    /// 32x32 avatar URL.
    pub fn avatar(&self) -> Result<String> {
        Ok(self.summary()?.str("avatar")?.to_owned())
    }

    /// 64x64 avatar URL.
    pub fn avatar_medium(&self) -> Result<String> {
        Ok(self.summary()?.str("avatarmedium")?.to_owned())
    }

    /// 184x184 avatar URL.
    pub fn avatar_full(&self) -> Result<String> {
        Ok(self.summary()?.str("avatarfull")?.to_owned())
    }

    /// Persona state.
    pub fn state(&self) -> Result<OnlineState> {
        let code = self.summary()?.u64("personastate")?;
        OnlineState::from_code(code).ok_or_else(|| Error::UnexpectedType {
            name: "personastate".to_owned(),
            expected: "an online state",
        })
    }

    /// Groups the user belongs to.
    pub fn groups(&self) -> Result<Vec<SteamGroup>> {
        GROUPS.get(self)
    }

    /// The user's primary group.
    pub fn group(&self) -> Result<SteamGroup> {
        GROUP.get(self)
    }

    /// The user's friends.
    ///
    /// With precaching enabled, the friends' summaries are fetched in bulk along with the list,
    /// so reading their names costs no further requests.
    pub fn friends(&self) -> Result<Vec<Arc<SteamUser>>> {
        FRIENDS.get(self)
    }

    /// Steam level.
    pub fn level(&self) -> Result<u64> {
        self.badge_data()?.u64("player_level")
    }

    /// Total experience points.
    pub fn xp(&self) -> Result<u64> {
        self.badge_data()?.u64("player_xp")
    }

    /// Earned badges.
    pub fn badges(&self) -> Result<Vec<SteamUserBadge>> {
        let data = self.badge_data()?;
        objects_or_empty(&data, "badges")?
            .into_iter()
            .map(SteamUserBadge::from_response)
            .collect()
    }

    /// Games played in the last two weeks.
    pub fn recently_played(&self) -> Result<Vec<Arc<SteamApp>>> {
        RECENTLY_PLAYED.get(self)
    }

    /// Owned games, with playtime.
    pub fn games(&self) -> Result<Vec<Arc<SteamApp>>> {
        GAMES.get(self)
    }

    /// Whether the account has a VAC ban on record.
    pub fn is_vac_banned(&self) -> Result<bool> {
        IS_VAC_BANNED.get(self)
    }

    /// Whether the account is banned from the community.
    pub fn is_community_banned(&self) -> Result<bool> {
        IS_COMMUNITY_BANNED.get(self)
    }

    fn call(&self, interface: &str, command: &str, version: &str, args: ApiArgs) -> Result<ApiResponse> {
        self.connection
            .call_response(interface, command, version, Method::Get, args)
    }

    fn first_player(response: ApiResponse) -> Result<ApiResponse> {
        response
            .objects("players")?
            .first()
            .map(|player| (*player).clone())
            .ok_or(Error::UserNotFound)
    }

    fn fetch_summary(&self) -> Result<ApiResponse> {
        let response = self.call(
            "ISteamUser",
            "GetPlayerSummaries",
            "v0002",
            ApiArgs::new().arg("steamids", self.steamid),
        )?;
        Self::first_player(response)
    }

    fn fetch_bans(&self) -> Result<ApiResponse> {
        let response = self.call(
            "ISteamUser",
            "GetPlayerBans",
            "v1",
            ApiArgs::new().arg("steamids", self.steamid),
        )?;
        Self::first_player(response)
    }

    fn fetch_badge_data(&self) -> Result<ApiResponse> {
        self.call(
            "IPlayerService",
            "GetBadges",
            "v1",
            ApiArgs::new().arg("steamid", self.steamid),
        )
    }

    fn fetch_currently_playing(&self) -> Result<Option<Arc<SteamApp>>> {
        let summary = self.summary()?;
        if !summary.contains("gameid") {
            return Ok(None);
        }
        let name = optional_str(&summary, "gameextrainfo")?;
        Ok(Some(Arc::new(SteamApp::new(
            self.connection.clone(),
            summary.u64("gameid")?,
            name,
        ))))
    }

    fn fetch_groups(&self) -> Result<Vec<SteamGroup>> {
        let response = self.call(
            "ISteamUser",
            "GetUserGroupList",
            "v1",
            ApiArgs::new().arg("steamid", self.steamid),
        )?;
        objects_or_empty(&response, "groups")?
            .into_iter()
            .map(|group| Ok(SteamGroup::new(group.u64("gid")?)))
            .collect()
    }

    fn fetch_friends(&self) -> Result<Vec<Arc<SteamUser>>> {
        let response = self.call(
            "ISteamUser",
            "GetFriendList",
            "v0001",
            ApiArgs::new()
                .arg("steamid", self.steamid)
                .arg("relationship", "friend"),
        )?;

        let friends = response
            .object("friendslist")?
            .objects("friends")?
            .into_iter()
            .map(|friend| {
                Ok(Arc::new(SteamUser {
                    friend_since: Some(timestamp(friend, "friend_since")?),
                    ..SteamUser::new(self.connection.clone(), friend.u64("steamid")?)
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        if self.connection.settings().precache {
            self.precache_summaries(&friends)?;
        }

        Ok(friends)
    }

    /// Fill the summary cache of `users` with bulk requests of [`PRECACHE_CHUNK_SIZE`] ids each.
    fn precache_summaries(&self, users: &[Arc<SteamUser>]) -> Result<()> {
        let by_id: HashMap<u64, &Arc<SteamUser>> =
            users.iter().map(|user| (user.steamid, user)).collect();

        for chunk in users.chunks(PRECACHE_CHUNK_SIZE) {
            let ids: Vec<u64> = chunk.iter().map(|user| user.steamid).collect();
            let response = self.call(
                "ISteamUser",
                "GetPlayerSummaries",
                "v0002",
                ApiArgs::new().arg("steamids", ids),
            )?;

            let now = Utc::now();
            for summary in response.objects("players")? {
                let Some(user) = summary
                    .get("steamid")
                    .and_then(|value| value.as_u64())
                    .and_then(|steamid| by_id.get(&steamid))
                else {
                    continue;
                };
                SUMMARY.store(user, summary.clone(), Some(now));
            }
        }

        log::debug!(target: "steamapi",
                    steamid = self.steamid,
                    friends = users.len();
                    "precached friend summaries");
        Ok(())
    }

    fn games_from(&self, response: &ApiResponse) -> Result<Vec<Arc<SteamApp>>> {
        objects_or_empty(response, "games")?
            .into_iter()
            .map(|game| {
                let app = SteamApp::new(
                    self.connection.clone(),
                    game.u64("appid")?,
                    optional_str(game, "name")?,
                )
                .with_playtime(
                    game.get("playtime_2weeks").and_then(|value| value.as_u64()),
                    game.get("playtime_forever").and_then(|value| value.as_u64()),
                );
                Ok(Arc::new(app))
            })
            .collect()
    }

    fn fetch_recently_played(&self) -> Result<Vec<Arc<SteamApp>>> {
        let response = self.call(
            "IPlayerService",
            "GetRecentlyPlayedGames",
            "v1",
            ApiArgs::new().arg("steamid", self.steamid),
        )?;
        self.games_from(&response)
    }

    fn fetch_games(&self) -> Result<Vec<Arc<SteamApp>>> {
        let response = self.call(
            "IPlayerService",
            "GetOwnedGames",
            "v1",
            ApiArgs::new()
                .arg("steamid", self.steamid)
                .arg("include_appinfo", true),
        )?;
        self.games_from(&response)
    }
}

impl Cacheable for SteamUser {
    fn property_cache(&self) -> &PropertyCache {
        &self.cache
    }
}

impl PartialEq for SteamUser {
    fn eq(&self, other: &Self) -> bool {
        self.steamid == other.steamid
    }
}

impl Eq for SteamUser {}

/// The SteamID, preceded by the quoted persona name once it is known.
impl std::fmt::Display for SteamUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match NAME.peek(self) {
            Some(name) => write!(f, "{:?} ({})", name, self.steamid),
            None => write!(f, "{}", self.steamid),
        }
    }
}

impl std::fmt::Debug for SteamUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteamUser")
            .field("steamid", &self.steamid)
            .field("friend_since", &self.friend_since)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{SteamUser, SteamUserBadge, NAME, SUMMARY};
    use crate::{ApiResponse, ConnectionConfig, Error};

    fn offline_user() -> SteamUser {
        let mut config = ConnectionConfig::anonymous();
        config.base_url("http://127.0.0.1:9/");
        SteamUser::new(Arc::new(config.to_connection().unwrap()), 76561197960435530)
    }

    fn response(body: serde_json::Value) -> ApiResponse {
        ApiResponse::from_body(body).unwrap()
    }

    #[test]
    fn display_uses_known_name_only() {
        let user = offline_user();
        assert_eq!(user.to_string(), "76561197960435530");
        NAME.store(&user, "Robin".to_owned(), None);
        assert_eq!(user.to_string(), "\"Robin\" (76561197960435530)");
    }

    #[test]
    fn summary_fields_come_from_stored_summary() {
        let user = offline_user();
        SUMMARY.store(
            &user,
            response(json!({
                "steamid": "76561197960435530",
                "personaname": "Robin",
                "profileurl": "https://steamcommunity.com/id/robinwalker/",
                "communityvisibilitystate": 3,
                "personastate": 1,
                "timecreated": 1063407589,
                "lastlogoff": 1700000000,
                "loccountrycode": "US",
                "primaryclanid": "103582791429521412",
                "gameid": "440",
                "gameextrainfo": "Team Fortress 2",
                "avatar": "a.jpg",
                "avatarmedium": "a_medium.jpg",
                "avatarfull": "a_full.jpg"
            })),
            None,
        );

        assert_eq!(user.name().unwrap(), "Robin");
        assert_eq!(user.real_name().unwrap(), None);
        assert_eq!(user.country_code().unwrap().as_deref(), Some("US"));
        assert_eq!(
            user.privacy().unwrap(),
            crate::CommunityVisibilityState::FriendsOfFriends
        );
        assert_eq!(user.state().unwrap(), crate::OnlineState::Online);
        assert_eq!(user.time_created().unwrap().timestamp(), 1063407589);
        assert_eq!(user.last_logoff().unwrap().timestamp(), 1700000000);
        assert_eq!(user.group().unwrap().guid(), 103582791429521412);
        assert_eq!(user.avatar_full().unwrap(), "a_full.jpg");

        let playing = user.currently_playing().unwrap().unwrap();
        assert_eq!(playing.appid(), 440);
        assert_eq!(playing.name().unwrap(), "Team Fortress 2");
    }

    #[test]
    fn missing_summary_field_is_reported() {
        let user = offline_user();
        SUMMARY.store(&user, response(json!({"steamid": "1"})), None);
        assert!(matches!(
            user.profile_url(),
            Err(Error::MissingField { name }) if name == "profileurl"
        ));
        assert!(user.currently_playing().unwrap().is_none());
    }

    #[test]
    fn parses_badges() {
        let badge = response(json!({
            "badgeid": 13,
            "level": 2,
            "completion_time": 1500000000,
            "xp": 250,
            "scarcity": 1000,
        }));
        let badge = SteamUserBadge::from_response(&badge).unwrap();
        assert_eq!(badge.badge_id, 13);
        assert_eq!(badge.appid, None);
        assert_eq!(badge.completion_time.timestamp(), 1500000000);
    }

    #[test]
    fn users_compare_by_steamid() {
        let a = offline_user();
        let b = offline_user();
        assert_eq!(a, b);
    }
}
