mod common;

use mockito::{Matcher, Server};
use serde_json::{json, Value};
use steamapi::{Error, InitPurchase, OnlineState, SteamApp, SteamIngameStore, SteamUser};

use common::{connection, connection_with, query, API_KEY};

fn summary(steamid: u64, name: &str) -> Value {
    json!({
        "steamid": steamid.to_string(),
        "personaname": name,
        "profileurl": format!("https://steamcommunity.com/profiles/{steamid}/"),
        "personastate": 1,
        "communityvisibilitystate": 3,
        "lastlogoff": 1700000000
    })
}

fn friend_list(steamids: impl IntoIterator<Item = u64>) -> String {
    let friends: Vec<Value> = steamids
        .into_iter()
        .map(|steamid| {
            json!({
                "steamid": steamid.to_string(),
                "relationship": "friend",
                "friend_since": 1300000000
            })
        })
        .collect();
    json!({"friendslist": {"friends": friends}}).to_string()
}

#[test]
fn summary_is_fetched_once_for_all_fields() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/ISteamUser/GetPlayerSummaries/v0002/")
        .match_query(query(&[("steamids", "1"), ("key", API_KEY)]))
        .with_status(200)
        .with_body(json!({"response": {"players": [summary(1, "gabe")]}}).to_string())
        .expect(1)
        .create();

    let user = SteamUser::new(connection(&server.url(), Some(API_KEY)), 1);
    assert_eq!(user.name().unwrap(), "gabe");
    assert_eq!(
        user.profile_url().unwrap(),
        "https://steamcommunity.com/profiles/1/"
    );
    assert_eq!(user.state().unwrap(), OnlineState::Online);
    assert_eq!(user.real_name().unwrap(), None);
    mock.assert();
}

#[test]
fn unknown_user_is_not_found() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/ISteamUser/GetPlayerSummaries/v0002/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"response": {"players": []}}).to_string())
        .create();

    let user = SteamUser::new(connection(&server.url(), Some(API_KEY)), 1);
    assert!(matches!(user.name(), Err(Error::UserNotFound)));
}

#[test]
fn friends_come_with_precached_summaries() {
    let mut server = Server::new();
    let friends = server
        .mock("GET", "/ISteamUser/GetFriendList/v0001/")
        .match_query(query(&[
            ("steamid", "1"),
            ("relationship", "friend"),
            ("key", API_KEY),
        ]))
        .with_status(200)
        .with_body(friend_list([2, 3, 4]))
        .create();
    let summaries = server
        .mock("GET", "/ISteamUser/GetPlayerSummaries/v0002/")
        .match_query(query(&[("steamids", "2,3,4"), ("key", API_KEY)]))
        .with_status(200)
        .with_body(
            json!({"response": {"players": [
                summary(4, "four"),
                summary(2, "two"),
                summary(3, "three")
            ]}})
            .to_string(),
        )
        .expect(1)
        .create();

    let user = SteamUser::new(connection(&server.url(), Some(API_KEY)), 1);
    let list = user.friends().unwrap();

    let names: Vec<String> = list.iter().map(|friend| friend.name().unwrap()).collect();
    assert_eq!(names, vec!["two", "three", "four"]);
    assert!(list.iter().all(|friend| friend.friend_since().is_some()));

    // The friend list itself is cached too.
    assert_eq!(user.friends().unwrap().len(), 3);

    friends.assert();
    summaries.assert();
}

#[test]
fn precache_requests_are_chunked() {
    let mut server = Server::new();
    let _friends = server
        .mock("GET", "/ISteamUser/GetFriendList/v0001/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(friend_list(100..140))
        .create();
    let summaries = server
        .mock("GET", "/ISteamUser/GetPlayerSummaries/v0002/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"response": {"players": []}}).to_string())
        .expect(2)
        .create();

    let user = SteamUser::new(connection(&server.url(), Some(API_KEY)), 1);
    assert_eq!(user.friends().unwrap().len(), 40);
    summaries.assert();
}

#[test]
fn precache_can_be_disabled() {
    let mut server = Server::new();
    let _friends = server
        .mock("GET", "/ISteamUser/GetFriendList/v0001/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(friend_list([2, 3]))
        .create();
    let summaries = server
        .mock("GET", "/ISteamUser/GetPlayerSummaries/v0002/")
        .match_query(Matcher::Any)
        .expect(0)
        .create();

    let user = SteamUser::new(connection_with(&server.url(), Some(API_KEY), false), 1);
    assert_eq!(user.friends().unwrap().len(), 2);
    summaries.assert();
}

#[test]
fn resolves_vanity_url() {
    let mut server = Server::new();
    let _found = server
        .mock("GET", "/ISteamUser/ResolveVanityURL/v0001/")
        .match_query(query(&[("vanityurl", "gabelogannewell")]))
        .with_status(200)
        .with_body(json!({"response": {"steamid": "76561197960287930", "success": 1}}).to_string())
        .create();
    let _missing = server
        .mock("GET", "/ISteamUser/ResolveVanityURL/v0001/")
        .match_query(query(&[("vanityurl", "nobody")]))
        .with_status(200)
        .with_body(json!({"response": {"success": 42, "message": "No match"}}).to_string())
        .create();

    let connection = connection(&server.url(), Some(API_KEY));
    let user = SteamUser::from_vanity_url(connection.clone(), "gabelogannewell").unwrap();
    assert_eq!(user.steamid(), 76561197960287930);

    assert!(matches!(
        SteamUser::from_vanity_url(connection, "nobody"),
        Err(Error::UserNotFound)
    ));
}

#[test]
fn owned_games_carry_names_and_playtime() {
    let mut server = Server::new();
    let _games = server
        .mock("GET", "/IPlayerService/GetOwnedGames/v1/")
        .match_query(query(&[("steamid", "1"), ("include_appinfo", "1")]))
        .with_status(200)
        .with_body(
            json!({"response": {"game_count": 1, "games": [
                {"appid": 440, "name": "Team Fortress 2", "playtime_forever": 120, "playtime_2weeks": 5}
            ]}})
            .to_string(),
        )
        .create();

    let user = SteamUser::new(connection(&server.url(), None), 1);
    let games = user.games().unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].appid(), 440);
    assert_eq!(games[0].name().unwrap(), "Team Fortress 2");
    assert_eq!(games[0].playtime_forever(), Some(120));
    assert_eq!(games[0].playtime_2weeks(), Some(5));
}

#[test]
fn app_name_is_fetched_once() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/ISteamUserStats/GetSchemaForGame/v2/")
        .match_query(query(&[("appid", "570")]))
        .with_status(200)
        .with_body(json!({"game": {"gameName": "Dota 2", "gameVersion": "1"}}).to_string())
        .expect(1)
        .create();

    let app = SteamApp::new(connection(&server.url(), None), 570, None);
    assert_eq!(app.name().unwrap(), "Dota 2");
    assert_eq!(app.name().unwrap(), "Dota 2");
    mock.assert();
}

#[test]
fn init_purchase_posts_item_arrays() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/ISteamMicroTxnSandbox/InitTxn/v3/")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("steamid".into(), "1".into()),
            Matcher::UrlEncoded("appid".into(), "480".into()),
            Matcher::UrlEncoded("orderid".into(), "99".into()),
            Matcher::UrlEncoded("itemid[0]".into(), "5".into()),
            Matcher::UrlEncoded("amount[0]".into(), "199".into()),
            Matcher::UrlEncoded("qty[0]".into(), "1".into()),
            Matcher::UrlEncoded("currency".into(), "USD".into()),
            Matcher::UrlEncoded("key".into(), API_KEY.into()),
        ]))
        .with_status(200)
        .with_body(json!({"response": {"result": "OK", "params": {"orderid": "99"}}}).to_string())
        .create();

    let store = SteamIngameStore::new(connection(&server.url(), Some(API_KEY)), 480, true);
    let response = store
        .init_purchase(InitPurchase {
            orderid: Some(99),
            ..InitPurchase::new(1, 5, 199)
        })
        .unwrap();

    assert_eq!(response.str("result").unwrap(), "OK");
    assert_eq!(response.object("params").unwrap().u64("orderid").unwrap(), 99);
    mock.assert();
}
