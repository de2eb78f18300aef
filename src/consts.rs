/// Who can see a user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommunityVisibilityState {
    /// Only the user.
    Private = 1,
    /// Friends of the user.
    FriendsOnly = 2,
    /// Friends and their friends.
    FriendsOfFriends = 3,
    /// Any logged-in user.
    UsersOnly = 4,
    /// Everyone.
    Public = 5,
}

impl CommunityVisibilityState {
    /// State for a numeric code sent by the API.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Self::Private),
            2 => Some(Self::FriendsOnly),
            3 => Some(Self::FriendsOfFriends),
            4 => Some(Self::UsersOnly),
            5 => Some(Self::Public),
            _ => None,
        }
    }
}

/// A user's persona state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnlineState {
    /// Offline, or the profile is private.
    Offline = 0,
    /// Online.
    Online = 1,
    /// Busy.
    Busy = 2,
    /// Away.
    Away = 3,
    /// Away for a long time.
    Snooze = 4,
    /// Looking to trade.
    LookingToTrade = 5,
    /// Looking to play.
    LookingToPlay = 6,
}

impl OnlineState {
    /// State for a numeric code sent by the API.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Offline),
            1 => Some(Self::Online),
            2 => Some(Self::Busy),
            3 => Some(Self::Away),
            4 => Some(Self::Snooze),
            5 => Some(Self::LookingToTrade),
            6 => Some(Self::LookingToPlay),
            _ => None,
        }
    }
}
