use super::*;
use tokio::sync::mpsc;

/// Hand-built container IO plus the far ends of its channels.
fn wired_session() -> (
    Session,
    mpsc::Receiver<Vec<u8>>,
    mpsc::Sender<OutputChunk>,
) {
    let (in_tx, in_rx) = mpsc::channel(16);
    let (out_tx, out_rx) = mpsc::channel(64);
    let session = Session::new(ContainerIo {
        stdin: in_tx,
        output: out_rx,
    });
    (session, in_rx, out_tx)
}

fn chunk(stream: StreamKind, text: &str) -> OutputChunk {
    OutputChunk {
        stream,
        data: text.as_bytes().to_vec(),
    }
}

/// Read the payload the session wrote and extract the marker token.
async fn token_from_payload(stdin: &mut mpsc::Receiver<Vec<u8>>) -> String {
    let payload = stdin.recv().await.unwrap();
    let text = String::from_utf8(payload).unwrap();
    let marker_line = text
        .lines()
        .find(|l| l.contains(EXIT_MARKER))
        .unwrap()
        .to_string();
    marker_line
        .split_whitespace()
        .nth(1)
        .unwrap()
        .trim_matches('"')
        .to_string()
}

#[tokio::test]
async fn run_command_parses_exit_code_and_streams_lines() {
    let (mut session, mut stdin, out_tx) = wired_session();

    let driver = tokio::spawn(async move {
        let token = token_from_payload(&mut stdin).await;
        out_tx
            .send(chunk(StreamKind::Stdout, "compiling\n"))
            .await
            .unwrap();
        out_tx
            .send(chunk(StreamKind::Stderr, "warning: dusty\n"))
            .await
            .unwrap();
        out_tx
            .send(chunk(
                StreamKind::Stdout,
                &format!("{} {} 0\n", EXIT_MARKER, token),
            ))
            .await
            .unwrap();
    });

    let mut seen = Vec::new();
    let mut sink = |stream: StreamKind, line: &str| {
        seen.push((stream, line.to_string()));
    };
    let exit_code = session
        .run_command("make", Duration::from_secs(5), &mut sink)
        .await
        .unwrap();

    driver.await.unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(
        seen,
        vec![
            (StreamKind::Stdout, "compiling".to_string()),
            (StreamKind::Stderr, "warning: dusty".to_string()),
        ]
    );
}

#[tokio::test]
async fn run_command_reports_nonzero_exit() {
    let (mut session, mut stdin, out_tx) = wired_session();

    tokio::spawn(async move {
        let token = token_from_payload(&mut stdin).await;
        out_tx
            .send(chunk(
                StreamKind::Stdout,
                &format!("{} {} 42\n", EXIT_MARKER, token),
            ))
            .await
            .unwrap();
    });

    let mut sink = |_: StreamKind, _: &str| {};
    let exit_code = session
        .run_command("false", Duration::from_secs(5), &mut sink)
        .await
        .unwrap();
    assert_eq!(exit_code, 42);
}

#[tokio::test]
async fn run_command_reassembles_split_lines() {
    let (mut session, mut stdin, out_tx) = wired_session();

    tokio::spawn(async move {
        let token = token_from_payload(&mut stdin).await;
        out_tx.send(chunk(StreamKind::Stdout, "hel")).await.unwrap();
        out_tx
            .send(chunk(StreamKind::Stdout, "lo world\n"))
            .await
            .unwrap();
        out_tx
            .send(chunk(
                StreamKind::Stdout,
                &format!("{} {} 0\n", EXIT_MARKER, token),
            ))
            .await
            .unwrap();
    });

    let mut seen = Vec::new();
    let mut sink = |_: StreamKind, line: &str| seen.push(line.to_string());
    session
        .run_command("echo", Duration::from_secs(5), &mut sink)
        .await
        .unwrap();
    assert_eq!(seen, vec!["hello world".to_string()]);
}

#[tokio::test]
async fn stale_markers_are_not_treated_as_output() {
    let (mut session, mut stdin, out_tx) = wired_session();

    tokio::spawn(async move {
        let token = token_from_payload(&mut stdin).await;
        // Marker from some earlier, timed-out command
        out_tx
            .send(chunk(
                StreamKind::Stdout,
                &format!("{} deadbeef 1\n", EXIT_MARKER),
            ))
            .await
            .unwrap();
        out_tx
            .send(chunk(
                StreamKind::Stdout,
                &format!("{} {} 0\n", EXIT_MARKER, token),
            ))
            .await
            .unwrap();
    });

    let mut seen = Vec::new();
    let mut sink = |_: StreamKind, line: &str| seen.push(line.to_string());
    let exit_code = session
        .run_command("true", Duration::from_secs(5), &mut sink)
        .await
        .unwrap();
    assert_eq!(exit_code, 0);
    assert!(seen.is_empty());
}

#[tokio::test(start_paused = true)]
async fn run_command_times_out() {
    let (mut session, _stdin, _out_tx) = wired_session();

    let mut sink = |_: StreamKind, _: &str| {};
    let err = session
        .run_command("sleep forever", Duration::from_secs(3), &mut sink)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::TimedOut));
}

#[tokio::test]
async fn closed_output_ends_the_session() {
    let (mut session, _stdin, out_tx) = wired_session();
    drop(out_tx);

    let mut sink = |_: StreamKind, _: &str| {};
    let err = session
        .run_command("true", Duration::from_secs(5), &mut sink)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Closed));
}

#[tokio::test]
async fn export_environment_quotes_values() {
    let (session, mut stdin, _out_tx) = wired_session();

    session
        .export_environment(&[("GREETING".to_string(), "it's alive".to_string())])
        .await
        .unwrap();

    let payload = String::from_utf8(stdin.recv().await.unwrap()).unwrap();
    assert_eq!(payload, "export GREETING='it'\\''s alive'\n");
}
