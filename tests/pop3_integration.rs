//! Retrieval server tests over real sockets.

mod common;

use common::TestServer;

const BOB: (&str, &str) = ("bob@example.com", "bobpass");
const CAROL: (&str, &str) = ("carol@example.com", "carolpass");

async fn deliver(server: &TestServer, recipient: &str, body: &str) {
    server.bridge().submit(recipient, body).await.unwrap();
}

#[tokio::test]
async fn test_greeting_and_quit() {
    let server = TestServer::with_accounts(&[BOB]).await;
    let mut client = server.pop3_client().await;

    assert_eq!(client.expect("+OK").await, "+OK POP3 server ready");
    assert_eq!(client.command("QUIT").await, "+OK Goodbye");
    assert_eq!(client.recv_line().await.unwrap(), None);
}

#[tokio::test]
async fn test_login_sequence() {
    let server = TestServer::with_accounts(&[BOB]).await;
    let mut client = server.pop3_client().await;
    client.expect("+OK").await;

    assert_eq!(client.command("PASS bobpass").await, "-ERR Send USER first");
    assert_eq!(client.command("USER nobody@example.com").await, "-ERR User not found");
    assert_eq!(client.command("USER bob@example.com").await, "+OK User accepted");
    assert_eq!(client.command("PASS wrong").await, "-ERR Invalid password");
    assert_eq!(client.command("PASS bobpass").await, "+OK Password accepted");
    assert_eq!(
        client.command("USER carol@example.com").await,
        "-ERR Already authenticated"
    );
}

#[tokio::test]
async fn test_auth_succeeds_only_on_exact_secret() {
    let server = TestServer::with_accounts(&[BOB, CAROL]).await;

    for (secret, expected) in [
        ("bobpass", true),
        ("carolpass", false),
        ("BOBPASS", false),
        ("bobpas", false),
        ("bobpass2", false),
        (" bobpass", false),
    ] {
        let mut client = server.pop3_client().await;
        client.expect("+OK").await;
        client.command("USER bob@example.com").await;
        let reply = client.command(&format!("PASS {secret}")).await;
        assert_eq!(reply.starts_with("+OK"), expected, "secret {secret:?}: {reply}");
    }
}

#[tokio::test]
async fn test_transaction_commands_rejected_before_login() {
    let server = TestServer::with_accounts(&[BOB]).await;
    deliver(&server, "bob@example.com", "Hello").await;
    let mut client = server.pop3_client().await;
    client.expect("+OK").await;

    assert_eq!(client.command("LIST").await, "-ERR Command not recognized");
    assert_eq!(client.command("RETR 1").await, "-ERR Command not recognized");
    assert_eq!(client.command("STAT").await, "-ERR Command not recognized");
}

#[tokio::test]
async fn test_list_counts_and_sizes() {
    let server = TestServer::with_accounts(&[BOB]).await;
    deliver(&server, "bob@example.com", "Hello").await;
    deliver(&server, "bob@example.com", "Two\nlines").await;
    let mut client = server.pop3_client().await;
    client.pop3_login(BOB.0, BOB.1).await;

    assert_eq!(client.command("LIST").await, "+OK 2 messages");
    assert_eq!(client.recv_multiline().await, vec!["1 7", "2 12"]);
}

#[tokio::test]
async fn test_retr_boundaries() {
    let server = TestServer::with_accounts(&[BOB]).await;
    deliver(&server, "bob@example.com", "one").await;
    deliver(&server, "bob@example.com", "two").await;
    let mut client = server.pop3_client().await;
    client.pop3_login(BOB.0, BOB.1).await;

    for bad in ["RETR 0", "RETR 3", "RETR -1", "RETR abc", "RETR"] {
        assert_eq!(client.command(bad).await, "-ERR No such message", "{bad}");
    }

    assert_eq!(client.command("RETR 2").await, "+OK 5 octets");
    let lines = client.recv_multiline().await;
    assert!(lines[0].starts_with("Date: "));
    assert_eq!(lines[1..], ["two".to_string()]);

    // The session is still usable after the failures.
    assert_eq!(client.command("QUIT").await, "+OK Goodbye");
}

#[tokio::test]
async fn test_retr_stuffs_leading_dots() {
    let server = TestServer::with_accounts(&[BOB]).await;
    deliver(&server, "bob@example.com", ".\n..two\nplain").await;
    let mut client = server.pop3_client().await;
    client.pop3_login(BOB.0, BOB.1).await;

    client.command("RETR 1").await;
    let lines = client.recv_multiline().await;
    assert_eq!(lines[1..], ["..", "...two", "plain"].map(String::from));
}

#[tokio::test]
async fn test_maildrop_reflects_new_mail_between_commands() {
    let server = TestServer::with_accounts(&[BOB]).await;
    let mut client = server.pop3_client().await;
    client.pop3_login(BOB.0, BOB.1).await;

    assert_eq!(client.command("LIST").await, "+OK 0 messages");
    assert!(client.recv_multiline().await.is_empty());

    deliver(&server, "bob@example.com", "late").await;

    assert_eq!(client.command("LIST").await, "+OK 1 messages");
    assert_eq!(client.recv_multiline().await, vec!["1 6"]);
}

#[tokio::test]
async fn test_account_added_at_runtime_can_log_in() {
    let server = TestServer::with_accounts(&[BOB]).await;
    server
        .credentials()
        .append("dave@example.com", "davepass")
        .await
        .unwrap();

    let mut client = server.pop3_client().await;
    client.pop3_login("dave@example.com", "davepass").await;

    let users = std::fs::read_to_string(server.users_path()).unwrap();
    assert!(users.lines().any(|l| l == "dave@example.com davepass"));
}

#[tokio::test]
async fn test_retr_returns_stray_cr_unchanged() {
    let server = TestServer::with_accounts(&[BOB]).await;
    let mut smtp = server.smtp_client().await;
    smtp.expect("220").await;
    smtp.command("RCPT TO: bob@example.com").await;
    smtp.command("DATA").await;
    smtp.send_raw("abc\r\r\n.\r\n").await.unwrap();
    smtp.expect("250").await;
    smtp.command("QUIT").await;

    let mut client = server.pop3_client().await;
    client.pop3_login(BOB.0, BOB.1).await;

    assert_eq!(client.command("LIST").await, "+OK 1 messages");
    assert_eq!(client.recv_multiline().await, vec!["1 6"]);
    assert_eq!(client.command("RETR 1").await, "+OK 6 octets");
    let lines = client.recv_multiline().await;
    assert_eq!(lines[1..], ["abc\r".to_string()]);
}

#[tokio::test]
async fn test_retr_dateless_message_shows_unknown_date() {
    let server = TestServer::with_accounts(&[BOB]).await;
    std::fs::write(
        server.mail_path(),
        "From: a@example.com\nTo: bob@example.com\n\nold mail\n---\n",
    )
    .unwrap();

    let mut client = server.pop3_client().await;
    client.pop3_login(BOB.0, BOB.1).await;

    assert_eq!(client.command("RETR 1").await, "+OK 10 octets");
    assert_eq!(
        client.recv_multiline().await,
        vec!["Date: Unknown Date", "old mail"]
    );
}
