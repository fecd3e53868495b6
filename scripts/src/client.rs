//! The interface to an Aptos network, and its implementation over the fullnode REST API

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};
use url::Url;

use crate::{
    account::LocalAccount,
    constants::{
        MAX_GAS_AMOUNT, PENDING_TRANSACTION_TYPE, TRANSACTION_EXPIRATION,
        WAIT_FOR_TRANSACTION_POLL_INTERVAL, WAIT_FOR_TRANSACTION_TIMEOUT,
    },
    errors::ScriptError,
    types::{AccountAddress, AccountModule, CommittedTransaction, EntryFunctionPayload},
};

/// The operations the scripts need from an Aptos network.
///
/// Every call is awaited to completion before the next one is issued.
#[allow(async_fn_in_trait)]
pub trait AptosClient {
    /// Funds an account from the network's faucet and waits for the funding to land
    async fn fund_account(&self, address: &AccountAddress, amount: u64) -> Result<(), ScriptError>;

    /// Signs a call with the given account and submits it, returning the transaction hash
    async fn sign_and_submit(
        &self,
        signer: &LocalAccount,
        payload: EntryFunctionPayload,
    ) -> Result<String, ScriptError>;

    /// Waits until the transaction with the given hash is committed
    async fn wait_for_transaction(&self, hash: &str) -> Result<CommittedTransaction, ScriptError>;

    /// Lists the modules published under an account
    async fn account_modules(
        &self,
        address: &AccountAddress,
    ) -> Result<Vec<AccountModule>, ScriptError>;

    /// The height of the block containing the given ledger version
    async fn block_height_by_version(&self, version: u64) -> Result<u64, ScriptError>;
}

// ------------------
// | REST API TYPES |
// ------------------

/// The subset of an account resource needed to build transactions
#[serde_as]
#[derive(Deserialize)]
struct AccountData {
    /// The next sequence number of the account
    #[serde_as(as = "DisplayFromStr")]
    sequence_number: u64,
}

/// The node's gas price estimate
#[derive(Deserialize)]
struct GasEstimation {
    /// The estimated gas unit price, in octas
    gas_estimate: u64,
}

/// The subset of a block needed to locate a deployment
#[serde_as]
#[derive(Deserialize)]
struct Block {
    /// The height of the block
    #[serde_as(as = "DisplayFromStr")]
    block_height: u64,
}

/// A transaction returned by the node, pending or committed
#[derive(Deserialize)]
struct TransactionStatus {
    /// The kind of transaction, `pending_transaction` until committed
    #[serde(rename = "type")]
    kind: String,
}

/// The response to a transaction submission
#[derive(Deserialize)]
struct PendingTransaction {
    /// The hash of the submitted transaction
    hash: String,
}

/// A user transaction, in the JSON form accepted by the node
#[serde_as]
#[derive(Serialize)]
struct UserTransactionRequest {
    /// The sending account
    sender: String,
    /// The sender's sequence number
    #[serde_as(as = "DisplayFromStr")]
    sequence_number: u64,
    /// The maximum gas the transaction may consume
    #[serde_as(as = "DisplayFromStr")]
    max_gas_amount: u64,
    /// The price paid per unit of gas
    #[serde_as(as = "DisplayFromStr")]
    gas_unit_price: u64,
    /// The unix timestamp after which the transaction is discarded
    #[serde_as(as = "DisplayFromStr")]
    expiration_timestamp_secs: u64,
    /// The call to execute
    payload: TransactionPayload,
    /// The sender's signature, absent while encoding the signing message
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<TransactionSignature>,
}

/// A transaction payload
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TransactionPayload {
    /// A call to an entry function
    EntryFunctionPayload(EntryFunctionPayload),
}

/// A transaction authenticator
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TransactionSignature {
    /// A single ed25519 signature
    Ed25519Signature {
        /// The hex-encoded public key
        public_key: String,
        /// The hex-encoded signature
        signature: String,
    },
}

// ---------------
// | REST CLIENT |
// ---------------

/// An [`AptosClient`] talking to a fullnode and a faucet over HTTP
#[derive(Debug, Clone)]
pub struct RestClient {
    /// The HTTP client shared by all requests
    http: reqwest::Client,
    /// The base URL of the fullnode REST API
    node_url: Url,
    /// The base URL of the faucet, if the network has one
    faucet_url: Option<Url>,
    /// How long to wait for a transaction to be committed
    wait_timeout: Duration,
}

impl RestClient {
    /// Creates a client for the given endpoints
    pub fn new(node_url: Url, faucet_url: Option<Url>) -> Result<Self, ScriptError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

        Ok(Self {
            http,
            node_url: with_trailing_slash(node_url),
            faucet_url: faucet_url.map(with_trailing_slash),
            wait_timeout: WAIT_FOR_TRANSACTION_TIMEOUT,
        })
    }

    /// Gives up waiting on a transaction after `timeout` instead of the default
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Resolves a path against the fullnode URL
    fn node_endpoint(&self, path: &str) -> Result<Url, ScriptError> {
        self.node_url
            .join(path)
            .map_err(|e| ScriptError::Request(e.to_string()))
    }

    /// Issues a GET request to the fullnode
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ScriptError> {
        let url = self.node_endpoint(path)?;
        trace!("GET {}", url);
        parse_response(self.http.get(url).send().await?).await
    }

    /// Issues a POST request with a JSON body to the fullnode
    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ScriptError> {
        let url = self.node_endpoint(path)?;
        trace!("POST {}", url);
        parse_response(self.http.post(url).json(body).send().await?).await
    }

    /// Builds the unsigned transaction for a call from the given account
    async fn build_transaction(
        &self,
        sender: &AccountAddress,
        payload: EntryFunctionPayload,
    ) -> Result<UserTransactionRequest, ScriptError> {
        let AccountData { sequence_number } = self.get(&format!("accounts/{}", sender)).await?;
        let GasEstimation { gas_estimate } = self.get("estimate_gas_price").await?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ScriptError::TransactionSubmission(e.to_string()))?;

        Ok(UserTransactionRequest {
            sender: sender.to_string(),
            sequence_number,
            max_gas_amount: MAX_GAS_AMOUNT,
            gas_unit_price: gas_estimate,
            expiration_timestamp_secs: (now + TRANSACTION_EXPIRATION).as_secs(),
            payload: TransactionPayload::EntryFunctionPayload(payload),
            signature: None,
        })
    }
}

impl AptosClient for RestClient {
    async fn fund_account(&self, address: &AccountAddress, amount: u64) -> Result<(), ScriptError> {
        let faucet_url = self.faucet_url.as_ref().ok_or_else(|| {
            ScriptError::Funding("no faucet is available for this network".to_string())
        })?;

        let mut url = faucet_url
            .join("mint")
            .map_err(|e| ScriptError::Funding(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("amount", &amount.to_string())
            .append_pair("address", &address.to_string());

        let response = self
            .http
            .post(url)
            .send()
            .await
            .map_err(|e| ScriptError::Funding(e.to_string()))?;
        let hashes: Vec<String> = parse_response(response)
            .await
            .map_err(|e| ScriptError::Funding(e.to_string()))?;

        for hash in hashes {
            debug!("Waiting for funding transaction {}", hash);
            self.wait_for_transaction(&hash)
                .await
                .and_then(CommittedTransaction::into_result)
                .map_err(|e| ScriptError::Funding(e.to_string()))?;
        }

        Ok(())
    }

    async fn sign_and_submit(
        &self,
        signer: &LocalAccount,
        payload: EntryFunctionPayload,
    ) -> Result<String, ScriptError> {
        let mut request = self.build_transaction(&signer.address(), payload).await?;

        let signing_message: String = self
            .post("transactions/encode_submission", &request)
            .await?;
        let message_bytes = hex::decode(signing_message.trim_start_matches("0x"))
            .map_err(|e| ScriptError::TransactionSubmission(e.to_string()))?;

        request.signature = Some(TransactionSignature::Ed25519Signature {
            public_key: signer.public_key_hex(),
            signature: signer.sign_hex(&message_bytes),
        });

        let PendingTransaction { hash } = self
            .post("transactions", &request)
            .await
            .map_err(|e| ScriptError::TransactionSubmission(e.to_string()))?;

        Ok(hash)
    }

    async fn wait_for_transaction(&self, hash: &str) -> Result<CommittedTransaction, ScriptError> {
        let deadline = Instant::now() + self.wait_timeout;
        let url = self.node_endpoint(&format!("transactions/wait_by_hash/{}", hash))?;

        loop {
            let response = self.http.get(url.clone()).send().await?;

            // The node may not know about a freshly submitted transaction yet
            if response.status() != StatusCode::NOT_FOUND {
                let body: serde_json::Value = parse_response(response).await?;
                let status: TransactionStatus = serde_json::from_value(body.clone())
                    .map_err(|e| ScriptError::Serde(e.to_string()))?;

                if status.kind != PENDING_TRANSACTION_TYPE {
                    return serde_json::from_value(body)
                        .map_err(|e| ScriptError::Serde(e.to_string()));
                }
            }

            if Instant::now() >= deadline {
                return Err(ScriptError::TransactionTimeout(hash.to_string()));
            }
            sleep(WAIT_FOR_TRANSACTION_POLL_INTERVAL).await;
        }
    }

    async fn account_modules(
        &self,
        address: &AccountAddress,
    ) -> Result<Vec<AccountModule>, ScriptError> {
        self.get(&format!("accounts/{}/modules", address)).await
    }

    async fn block_height_by_version(&self, version: u64) -> Result<u64, ScriptError> {
        let Block { block_height } = self.get(&format!("blocks/by_version/{}", version)).await?;
        Ok(block_height)
    }
}

/// Deserializes a successful response, or turns an error response into a [`ScriptError`]
async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ScriptError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ScriptError::Request(format!("{}: {}", status, text)));
    }

    serde_json::from_str(&text).map_err(|e| ScriptError::Serde(e.to_string()))
}

/// Ensures relative paths are joined onto the URL rather than replacing its last segment
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use ed25519_dalek::SigningKey;
    use serde_json::{json, Value};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };
    use url::Url;

    use super::{AptosClient, RestClient};
    use crate::{
        account::LocalAccount,
        errors::ScriptError,
        types::{AccountAddress, EntryFunctionPayload},
    };

    /// A request received by the test server: the request line and the body
    type Received = (String, String);

    /// Serves the given `(status, body)` responses in order, one per connection,
    /// repeating the last one once the others are used up.
    ///
    /// Returns the server's base URL and the requests it received.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (Url, Arc<Mutex<Vec<Received>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = received.clone();
        tokio::spawn(async move {
            for i in 0.. {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                log.lock().unwrap().push(request);

                let (status, body) = responses[i.min(responses.len() - 1)];
                let reason = if status == 200 { "OK" } else { "Not Found" };
                let reply = format!(
                    "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });

        (url, received)
    }

    /// Reads a whole HTTP request off the stream
    async fn read_request(stream: &mut TcpStream) -> Received {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_len = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            assert!(n > 0, "connection closed mid-request");
        };

        let head = String::from_utf8_lossy(&buf[..head_len]).to_string();
        let body_len = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_len + body_len {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let line = head.lines().next().unwrap_or_default().to_string();
        let body = String::from_utf8_lossy(&buf[head_len..]).to_string();
        (line, body)
    }

    /// A client for a node served under `/v1` and a faucet at the root,
    /// bypassing any proxy configured in the environment
    fn client(url: &Url) -> RestClient {
        RestClient {
            http: reqwest::Client::builder().no_proxy().build().unwrap(),
            ..RestClient::new(url.join("v1").unwrap(), Some(url.clone())).unwrap()
        }
    }

    const COMMITTED: &str = r#"{"type":"user_transaction","hash":"0xab","version":"42","success":true,"vm_status":"Executed successfully"}"#;

    const PENDING: &str = r#"{"type":"pending_transaction","hash":"0xab"}"#;

    #[tokio::test]
    async fn test_wait_retries_unknown_transactions() {
        let (url, received) = serve(vec![(404, "{}"), (200, PENDING), (200, COMMITTED)]).await;

        let tx = client(&url).wait_for_transaction("0xab").await.unwrap();

        assert_eq!(tx.hash, "0xab");
        assert_eq!(tx.version, 42);
        assert!(tx.success);
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 3);
        assert!(received
            .iter()
            .all(|(line, _)| line == "GET /v1/transactions/wait_by_hash/0xab HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_wait_times_out_on_pending_transactions() {
        let (url, _) = serve(vec![(200, PENDING)]).await;

        let result = client(&url)
            .with_wait_timeout(Duration::ZERO)
            .wait_for_transaction("0xab")
            .await;

        match result {
            Err(ScriptError::TransactionTimeout(hash)) => assert_eq!(hash, "0xab"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_funding_without_faucet_fails() {
        let client =
            RestClient::new(Url::parse("https://api.mainnet.aptoslabs.com/v1").unwrap(), None)
                .unwrap();

        let result = client.fund_account(&"0x1".parse().unwrap(), 100).await;

        assert!(matches!(result, Err(ScriptError::Funding(_))));
    }

    #[tokio::test]
    async fn test_funding_waits_for_every_faucet_transaction() {
        let (url, received) =
            serve(vec![(200, r#"["0x01","0x02"]"#), (200, COMMITTED), (200, COMMITTED)]).await;
        let address: AccountAddress = "0xcafe".parse().unwrap();

        client(&url).fund_account(&address, 500).await.unwrap();

        let lines: Vec<String> = received
            .lock()
            .unwrap()
            .iter()
            .map(|(line, _)| line.clone())
            .collect();
        assert_eq!(
            lines,
            [
                format!("POST /mint?amount=500&address={} HTTP/1.1", address),
                "GET /v1/transactions/wait_by_hash/0x01 HTTP/1.1".to_string(),
                "GET /v1/transactions/wait_by_hash/0x02 HTTP/1.1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_faucet_transaction_is_a_funding_error() {
        let failed = r#"{"type":"user_transaction","hash":"0x01","version":"7","success":false,"vm_status":"Out of gas"}"#;
        let (url, _) = serve(vec![(200, r#"["0x01"]"#), (200, failed)]).await;

        let result = client(&url).fund_account(&"0xcafe".parse().unwrap(), 500).await;

        assert!(matches!(result, Err(ScriptError::Funding(_))));
    }

    #[tokio::test]
    async fn test_sign_and_submit_round_trip() {
        let (url, received) = serve(vec![
            (200, r#"{"sequence_number":"3","authentication_key":"0x00"}"#),
            (200, r#"{"gas_estimate":150}"#),
            (200, r#""0xdeadbeef""#),
            (200, r#"{"hash":"0xfeed"}"#),
        ])
        .await;
        let signer = LocalAccount::from_signing_key(SigningKey::from_bytes(&[7u8; 32]));

        let hash = client(&url)
            .sign_and_submit(&signer, EntryFunctionPayload::new("0x1::m::f", vec![json!("1")]))
            .await
            .unwrap();
        assert_eq!(hash, "0xfeed");

        let received = received.lock().unwrap();
        let lines: Vec<&str> = received.iter().map(|(line, _)| line.as_str()).collect();
        assert_eq!(
            lines,
            [
                format!("GET /v1/accounts/{} HTTP/1.1", signer.address()).as_str(),
                "GET /v1/estimate_gas_price HTTP/1.1",
                "POST /v1/transactions/encode_submission HTTP/1.1",
                "POST /v1/transactions HTTP/1.1",
            ]
        );

        // The signing message is encoded from the unsigned transaction
        let unsigned: Value = serde_json::from_str(&received[2].1).unwrap();
        assert_eq!(unsigned["sequence_number"], "3");
        assert_eq!(unsigned["gas_unit_price"], "150");
        assert!(unsigned.get("signature").is_none());

        // The submitted transaction carries the signature over that message
        let submitted: Value = serde_json::from_str(&received[3].1).unwrap();
        assert_eq!(
            submitted["signature"],
            json!({
                "type": "ed25519_signature",
                "public_key": signer.public_key_hex(),
                "signature": signer.sign_hex(&[0xde, 0xad, 0xbe, 0xef]),
            })
        );
        assert_eq!(submitted["payload"]["function"], "0x1::m::f");
    }

    #[test]
    fn test_endpoints_keep_api_version() {
        let client = RestClient::new(
            Url::parse("https://api.devnet.aptoslabs.com/v1").unwrap(),
            None,
        )
        .unwrap();

        assert_eq!(
            client.node_endpoint("accounts/0x1/modules").unwrap().as_str(),
            "https://api.devnet.aptoslabs.com/v1/accounts/0x1/modules"
        );
    }

    #[test]
    fn test_transaction_request_shape() {
        let request = super::UserTransactionRequest {
            sender: "0x1".to_string(),
            sequence_number: 0,
            max_gas_amount: 200_000,
            gas_unit_price: 100,
            expiration_timestamp_secs: 1_700_000_000,
            payload: super::TransactionPayload::EntryFunctionPayload(
                crate::types::EntryFunctionPayload::new("0x1::m::f", vec![]),
            ),
            signature: None,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "sender": "0x1",
                "sequence_number": "0",
                "max_gas_amount": "200000",
                "gas_unit_price": "100",
                "expiration_timestamp_secs": "1700000000",
                "payload": {
                    "type": "entry_function_payload",
                    "function": "0x1::m::f",
                    "type_arguments": [],
                    "arguments": []
                }
            })
        );
    }
}
