use std::sync::Arc;

use rand::{thread_rng, Rng};

use crate::{ApiArgs, ApiConnection, ApiResponse, Method, Result};

const INTERFACE: &str = "ISteamMicroTxn";
const SANDBOX_INTERFACE: &str = "ISteamMicroTxnSandbox";

/// Parameters of a single-item purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct InitPurchase {
    /// Buyer.
    pub steamid: u64,
    /// Game-defined item id.
    pub itemid: u64,
    /// Total price, in cents.
    pub amount: u64,
    /// Number of distinct items in the order.
    pub itemcount: u32,
    /// ISO 639-1 language of the item description.
    pub language: String,
    /// ISO 4217 currency of `amount`.
    pub currency: String,
    /// Quantity of the item.
    pub qty: u32,
    /// Shown to the user in the purchase dialog.
    pub description: String,
    /// Unique id of the order. A random one is generated when `None`.
    pub orderid: Option<u64>,
}

impl InitPurchase {
    /// One USD item with an English placeholder description and a random order id.
    pub fn new(steamid: u64, itemid: u64, amount: u64) -> Self {
        InitPurchase {
            steamid,
            itemid,
            amount,
            itemcount: 1,
            language: "en".to_owned(),
            currency: "USD".to_owned(),
            qty: 1,
            description: "Some description".to_owned(),
            orderid: None,
        }
    }

    fn into_args(self, appid: u64) -> ApiArgs {
        let orderid = self.orderid.unwrap_or_else(|| thread_rng().gen());
        ApiArgs::new()
            .arg("steamid", self.steamid)
            .arg("itemid[0]", self.itemid)
            .arg("amount[0]", self.amount)
            .arg("appid", appid)
            .arg("orderid", orderid)
            .arg("itemcount", self.itemcount)
            .arg("language", self.language)
            .arg("currency", self.currency)
            .arg("qty[0]", self.qty)
            .arg("description[0]", self.description)
    }
}

/// In-game purchases (microtransactions) of one app.
#[derive(Debug)]
pub struct SteamIngameStore {
    connection: Arc<ApiConnection>,
    appid: u64,
    interface: &'static str,
}

impl SteamIngameStore {
    /// `sandbox` selects the testing interface, where no money changes hands.
    pub fn new(connection: Arc<ApiConnection>, appid: u64, sandbox: bool) -> Self {
        SteamIngameStore {
            connection,
            appid,
            interface: if sandbox { SANDBOX_INTERFACE } else { INTERFACE },
        }
    }

    /// The app selling the items.
    pub fn appid(&self) -> u64 {
        self.appid
    }

    /// `ISteamMicroTxn` or `ISteamMicroTxnSandbox`.
    pub fn interface(&self) -> &str {
        self.interface
    }

    fn call(&self, command: &str, version: &str, method: Method, args: ApiArgs) -> Result<ApiResponse> {
        self.connection
            .call_response(self.interface, command, version, method, args)
    }

    /// Purchase-related information about a user, such as country and currency.
    pub fn user_info(&self, steamid: u64) -> Result<ApiResponse> {
        self.call(
            "GetUserInfo",
            "v1",
            Method::Get,
            ApiArgs::new()
                .arg("steamid", steamid)
                .arg("appid", self.appid),
        )
    }

    /// Start a purchase. The user confirms it in the Steam client.
    pub fn init_purchase(&self, purchase: InitPurchase) -> Result<ApiResponse> {
        let args = purchase.into_args(self.appid);
        self.call("InitTxn", "v3", Method::Post, args)
    }

    /// Status of an order.
    pub fn query_txn(&self, orderid: u64) -> Result<ApiResponse> {
        self.call(
            "QueryTxn",
            "v1",
            Method::Get,
            ApiArgs::new()
                .arg("appid", self.appid)
                .arg("orderid", orderid),
        )
    }

    /// Refund a completed order.
    pub fn refund_txn(&self, orderid: u64) -> Result<ApiResponse> {
        self.call(
            "RefundTxn",
            "v1",
            Method::Post,
            ApiArgs::new()
                .arg("appid", self.appid)
                .arg("orderid", orderid),
        )
    }

    /// Complete an order the user has approved.
    pub fn finalize_txn(&self, orderid: u64) -> Result<ApiResponse> {
        self.call(
            "FinalizeTxn",
            "v1",
            Method::Post,
            ApiArgs::new()
                .arg("appid", self.appid)
                .arg("orderid", orderid),
        )
    }
}
