//! Find Webex rooms by title, creating them under a team when they don't exist
//! yet.
//!
//! Webex has no lookup-by-title, so both steps list every group room visible
//! to the token and scan the titles. A team is found via its general room,
//! which always carries the team's own title.

use super::{api::*, error::WebexError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::{collections::HashSet, fmt};
use tracing::{debug, info, warn};
use url::Url;

/// Team titles as are visible in the Webex UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamTitle(pub String);

impl fmt::Display for TeamTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The opaque ID Webex hands out for a team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamId(pub String);

/// Room titles as are visible in the Webex UI. Matching is exact and
/// case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTitle(pub String);

impl fmt::Display for RoomTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The opaque ID Webex hands out for a room, which is what every message
/// endpoint expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        RoomId(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Direct,
    Group,
}

/// <https://developer.webex.com/docs/api/v1/rooms/get-room-details>
// Only a few fields drive resolution; the rest are kept for logging.
#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(deserialize_with = "crate::de::non_empty")]
    pub id: RoomId,
    pub title: RoomTitle,
    #[serde(rename = "type")]
    pub typ: RoomType,
    #[serde(default)]
    pub is_locked: bool,
    pub team_id: Option<TeamId>,
    pub created: DateTime<Utc>,
    pub last_activity: Option<DateTime<Utc>>,
}

/// <https://developer.webex.com/docs/api/v1/rooms/list-rooms>
#[skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    team_id: Option<&'a TeamId>,
    #[serde(rename = "type")]
    typ: RoomType,
    /// Maximum supported is 1000.
    max: u16,
}

/// <https://developer.webex.com/docs/api/v1/rooms/create-a-room>
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    title: &'a RoomTitle,
    team_id: &'a TeamId,
}

impl WebexClient {
    /// Get the ID of the room titled `room` within the team titled `team`,
    /// creating the room if the team doesn't have one by that title yet.
    pub async fn resolve_room(
        &self,
        team: &TeamTitle,
        room: &RoomTitle,
    ) -> Result<RoomId, WebexError> {
        let team_id = self.resolve_team(team).await?;

        let rooms = self.list_rooms(Some(&team_id)).await?;
        if let Some(found) = find_by_title(&rooms, &room.0) {
            info!("Found room >>{}<< ({})", room, found.id);
            return Ok(found.id.clone());
        }

        info!("No room >>{}<< in team >>{}<<, creating it", room, team);
        let created = self
            .create_room(room, &team_id)
            .await
            .map_err(|e| WebexError::RoomCreationFailed {
                title: room.clone(),
                source: Box::new(e),
            })?;

        info!("Created room >>{}<< ({})", room, created.id);
        Ok(created.id)
    }

    /// Get the ID of the team titled `team` by way of its general room.
    /// Standalone rooms sharing the title are passed over.
    async fn resolve_team(&self, team: &TeamTitle) -> Result<TeamId, WebexError> {
        let mut rooms = self.list_rooms(None).await?;
        rooms.retain(|r| r.team_id.is_some());

        let team_id = find_by_title(&rooms, &team.0)
            .and_then(|r| r.team_id.clone())
            .ok_or_else(|| WebexError::UnknownTeam(team.clone()))?;

        debug!("Resolved team >>{}<< to {}", team, team_id.0);
        Ok(team_id)
    }

    /// List every group room visible to us, optionally restricted to a team,
    /// following pagination to the end. A page is never fetched twice.
    async fn list_rooms(&self, team_id: Option<&TeamId>) -> Result<Vec<Room>, WebexError> {
        let mut rooms: Vec<Room> = Vec::new();
        let mut req = self.get("/rooms").query(&ListRequest {
            team_id,
            typ: RoomType::Group,
            max: 1000,
        });

        let mut seen: HashSet<Url> = url_of(&req).into_iter().collect();

        loop {
            let res = execute(req).await?;
            let next = next_page(res.headers());

            let mut page: Items<Room> = parse_response(res).await?;
            rooms.append(&mut page.items);

            match next {
                Some(url) if !seen.insert(url.clone()) => {
                    warn!("Pagination link {} was already followed, stopping", url);
                    break;
                }
                Some(url) => req = self.follow(url)?,
                None => break,
            }
        }

        debug!("Listed {} group rooms", rooms.len());
        Ok(rooms)
    }

    async fn create_room(&self, title: &RoomTitle, team_id: &TeamId) -> Result<Room, WebexError> {
        fetch(self.post_json("/rooms", &CreateRequest { title, team_id })).await
    }
}

/// Pick the first room in listing order with exactly this title. Webex doesn't
/// enforce unique titles, so duplicates are reported rather than resolved.
fn find_by_title<'a>(rooms: &'a [Room], title: &str) -> Option<&'a Room> {
    let mut matches = rooms.iter().filter(|r| r.title.0 == title);
    let first = matches.next();

    let others = matches.count();
    if others > 0 {
        warn!(
            "{} rooms are titled >>{}<<, using the first listed",
            others + 1,
            title
        );
    }

    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webex::auth::WebexAccessToken;
    use mockito::Matcher;
    use serde_json::{json, Value};

    fn client(base: &str) -> WebexClient {
        let base = Url::parse(base).unwrap();
        WebexClient::new(&base, WebexAccessToken("foobar".into()), None).unwrap()
    }

    fn room(id: &str, title: &str, team_id: Option<&str>) -> Value {
        json!({
            "id": id,
            "title": title,
            "type": "group",
            "isLocked": false,
            "teamId": team_id,
            "lastActivity": "2024-03-01T09:30:00.000Z",
            "created": "2024-02-01T09:30:00.000Z"
        })
    }

    fn items(rooms: Vec<Value>) -> String {
        json!({ "items": rooms }).to_string()
    }

    fn team_query() -> Matcher {
        Matcher::Regex("^type=group&max=1000$".into())
    }

    fn room_query(team_id: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("teamId".into(), team_id.into()),
            Matcher::UrlEncoded("type".into(), "group".into()),
        ])
    }

    #[test]
    fn test_find_by_title() {
        let rooms: Vec<Room> = serde_json::from_value(json!([
            room("R1", "Alerts", Some("T1")),
            room("R2", "alerts", Some("T1")),
            room("R3", "Alerts", Some("T1")),
        ]))
        .unwrap();

        assert_eq!(find_by_title(&rooms, "Alerts").unwrap().id, RoomId("R1".into()));
        assert_eq!(find_by_title(&rooms, "alerts").unwrap().id, RoomId("R2".into()));
        assert!(find_by_title(&rooms, "ALERTS").is_none());
        assert!(find_by_title(&[], "Alerts").is_none());
    }

    #[test]
    fn test_room_parsing() {
        let r: Room = serde_json::from_value(json!({
            "id": "R1",
            "title": "Direct",
            "type": "direct",
            "isLocked": true,
            "created": "2024-02-01T09:30:00.000Z"
        }))
        .unwrap();

        assert_eq!(r.typ, RoomType::Direct);
        assert!(r.is_locked);
        assert!(r.team_id.is_none());
        assert!(r.last_activity.is_none());
    }

    #[tokio::test]
    async fn test_unknown_team() {
        let mut srv = mockito::Server::new_async().await;

        let team_mock = srv
            .mock("GET", "/rooms")
            .match_query(team_query())
            .match_header("authorization", "Bearer foobar")
            .with_body(items(vec![room("R0", "Other Team", Some("T9"))]))
            .create_async()
            .await;

        let room_mock = srv
            .mock("GET", "/rooms")
            .match_query(Matcher::UrlEncoded("teamId".into(), "T9".into()))
            .expect(0)
            .create_async()
            .await;

        let create_mock = srv.mock("POST", "/rooms").expect(0).create_async().await;

        let res = client(&srv.url())
            .resolve_room(&TeamTitle("Ops".into()), &RoomTitle("Alerts".into()))
            .await;

        team_mock.assert_async().await;
        room_mock.assert_async().await;
        create_mock.assert_async().await;

        match res {
            Err(WebexError::UnknownTeam(t)) => assert_eq!(t, TeamTitle("Ops".into())),
            _ => panic!("expected an unknown team"),
        }
    }

    #[tokio::test]
    async fn test_team_room_without_team() {
        let mut srv = mockito::Server::new_async().await;

        let team_mock = srv
            .mock("GET", "/rooms")
            .match_query(team_query())
            .with_body(items(vec![room("R0", "Ops", None)]))
            .create_async()
            .await;

        let res = client(&srv.url())
            .resolve_room(&TeamTitle("Ops".into()), &RoomTitle("Alerts".into()))
            .await;

        team_mock.assert_async().await;
        assert!(matches!(res, Err(WebexError::UnknownTeam(_))));
    }

    #[tokio::test]
    async fn test_standalone_room_does_not_hide_team() {
        let mut srv = mockito::Server::new_async().await;

        let team_mock = srv
            .mock("GET", "/rooms")
            .match_query(team_query())
            .with_body(items(vec![
                room("R9", "Ops", None),
                room("R0", "Ops", Some("T1")),
            ]))
            .create_async()
            .await;

        let room_mock = srv
            .mock("GET", "/rooms")
            .match_query(room_query("T1"))
            .with_body(items(vec![room("R2", "Alerts", Some("T1"))]))
            .create_async()
            .await;

        let res = client(&srv.url())
            .resolve_room(&TeamTitle("Ops".into()), &RoomTitle("Alerts".into()))
            .await
            .unwrap();

        team_mock.assert_async().await;
        room_mock.assert_async().await;

        assert_eq!(res, RoomId("R2".into()));
    }

    #[tokio::test]
    async fn test_existing_room() {
        let mut srv = mockito::Server::new_async().await;

        let team_mock = srv
            .mock("GET", "/rooms")
            .match_query(team_query())
            .with_body(items(vec![
                room("R0", "Other Team", Some("T9")),
                room("R1", "Ops", Some("T1")),
            ]))
            .create_async()
            .await;

        let room_mock = srv
            .mock("GET", "/rooms")
            .match_query(room_query("T1"))
            .with_body(items(vec![
                room("R1", "Ops", Some("T1")),
                room("R2", "Alerts", Some("T1")),
            ]))
            .create_async()
            .await;

        let create_mock = srv.mock("POST", "/rooms").expect(0).create_async().await;

        let res = client(&srv.url())
            .resolve_room(&TeamTitle("Ops".into()), &RoomTitle("Alerts".into()))
            .await
            .unwrap();

        team_mock.assert_async().await;
        room_mock.assert_async().await;
        create_mock.assert_async().await;

        assert_eq!(res, RoomId("R2".into()));
    }

    #[tokio::test]
    async fn test_missing_room_is_created() {
        let mut srv = mockito::Server::new_async().await;

        let team_mock = srv
            .mock("GET", "/rooms")
            .match_query(team_query())
            .with_body(items(vec![room("R1", "Ops", Some("T1"))]))
            .create_async()
            .await;

        let room_mock = srv
            .mock("GET", "/rooms")
            .match_query(room_query("T1"))
            .with_body(items(vec![room("R1", "Ops", Some("T1"))]))
            .create_async()
            .await;

        let create_mock = srv
            .mock("POST", "/rooms")
            .match_header("content-type", "application/json; charset=utf-8")
            .match_body(Matcher::Json(json!({ "title": "Alerts", "teamId": "T1" })))
            .with_body(room("R7", "Alerts", Some("T1")).to_string())
            .expect(1)
            .create_async()
            .await;

        let res = client(&srv.url())
            .resolve_room(&TeamTitle("Ops".into()), &RoomTitle("Alerts".into()))
            .await
            .unwrap();

        team_mock.assert_async().await;
        room_mock.assert_async().await;
        create_mock.assert_async().await;

        assert_eq!(res, RoomId("R7".into()));
    }

    #[tokio::test]
    async fn test_room_creation_failed() {
        let mut srv = mockito::Server::new_async().await;

        let team_mock = srv
            .mock("GET", "/rooms")
            .match_query(team_query())
            .with_body(items(vec![room("R1", "Ops", Some("T1"))]))
            .create_async()
            .await;

        let room_mock = srv
            .mock("GET", "/rooms")
            .match_query(room_query("T1"))
            .with_body(items(vec![]))
            .create_async()
            .await;

        let create_mock = srv
            .mock("POST", "/rooms")
            .with_status(403)
            .with_body(r#"{ "message": "User is not a member of the team.", "trackingId": "ROUTER_2" }"#)
            .create_async()
            .await;

        let res = client(&srv.url())
            .resolve_room(&TeamTitle("Ops".into()), &RoomTitle("Alerts".into()))
            .await;

        team_mock.assert_async().await;
        room_mock.assert_async().await;
        create_mock.assert_async().await;

        match res {
            Err(WebexError::RoomCreationFailed { title, source }) => {
                assert_eq!(title, RoomTitle("Alerts".into()));
                assert!(matches!(*source, WebexError::APIResponseError { .. }));
            }
            _ => panic!("expected a failed room creation"),
        }
    }

    #[tokio::test]
    async fn test_listing_follows_pages() {
        let mut srv = mockito::Server::new_async().await;

        let next = format!(
            r#"<{}/rooms?type=group&max=1000&cursor=page2>; rel="next""#,
            srv.url()
        );

        let page1_mock = srv
            .mock("GET", "/rooms")
            .match_query(team_query())
            .with_header("link", &next)
            .with_body(items(vec![room("R0", "Other Team", Some("T9"))]))
            .create_async()
            .await;

        let page2_mock = srv
            .mock("GET", "/rooms")
            .match_query(Matcher::UrlEncoded("cursor".into(), "page2".into()))
            .match_header("authorization", "Bearer foobar")
            .with_body(items(vec![room("R1", "Ops", Some("T1"))]))
            .create_async()
            .await;

        let room_mock = srv
            .mock("GET", "/rooms")
            .match_query(room_query("T1"))
            .with_body(items(vec![room("R2", "Alerts", Some("T1"))]))
            .create_async()
            .await;

        let res = client(&srv.url())
            .resolve_room(&TeamTitle("Ops".into()), &RoomTitle("Alerts".into()))
            .await
            .unwrap();

        page1_mock.assert_async().await;
        page2_mock.assert_async().await;
        room_mock.assert_async().await;

        assert_eq!(res, RoomId("R2".into()));
    }

    #[tokio::test]
    async fn test_listing_stops_on_repeated_page() {
        let mut srv = mockito::Server::new_async().await;

        let page2 = format!(
            r#"<{}/rooms?type=group&max=1000&cursor=page2>; rel="next""#,
            srv.url()
        );

        let page1_mock = srv
            .mock("GET", "/rooms")
            .match_query(team_query())
            .with_header("link", &page2)
            .with_body(items(vec![room("R0", "Other Team", Some("T9"))]))
            .expect(1)
            .create_async()
            .await;

        // The second page keeps pointing at itself.
        let page2_mock = srv
            .mock("GET", "/rooms")
            .match_query(Matcher::UrlEncoded("cursor".into(), "page2".into()))
            .with_header("link", &page2)
            .with_body(items(vec![room("R1", "Ops", Some("T1"))]))
            .expect(1)
            .create_async()
            .await;

        let team_id = client(&srv.url())
            .resolve_team(&TeamTitle("Ops".into()))
            .await
            .unwrap();

        page1_mock.assert_async().await;
        page2_mock.assert_async().await;

        assert_eq!(team_id, TeamId("T1".into()));
    }

    #[tokio::test]
    async fn test_listing_refuses_foreign_page() {
        let mut srv = mockito::Server::new_async().await;
        let mut elsewhere = mockito::Server::new_async().await;

        let foreign = format!(
            r#"<{}/rooms?type=group&max=1000&cursor=page2>; rel="next""#,
            elsewhere.url()
        );

        let page1_mock = srv
            .mock("GET", "/rooms")
            .match_query(team_query())
            .with_header("link", &foreign)
            .with_body(items(vec![room("R0", "Other Team", Some("T9"))]))
            .create_async()
            .await;

        let foreign_mock = elsewhere
            .mock("GET", "/rooms")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let res = client(&srv.url())
            .resolve_team(&TeamTitle("Ops".into()))
            .await;

        page1_mock.assert_async().await;
        foreign_mock.assert_async().await;

        assert!(matches!(res, Err(WebexError::ForeignPageLink(_))));
    }
}
