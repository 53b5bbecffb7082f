//! Interactive terminal study loop.

use std::sync::Arc;

use flashdeck_core::model::{AnswerFace, DeckId, FaceSegment};
use services::{
    Direction, OrderMode, SessionConfig, SessionPhase, SessionView, StudyLoopService,
    StudySession, TickScheduler, TokioTickScheduler,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// One line typed by the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Start,
    Reveal,
    Next,
    Previous,
    /// 1-based card number.
    Goto(usize),
    Finish,
    Restart,
    ToggleOrder,
    ToggleTimer,
    Seconds(u32),
    Help,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let mut parts = line.split_whitespace();
    let head = parts.next()?;
    let arg = parts.next();
    if parts.next().is_some() {
        return None;
    }
    match (head, arg) {
        ("s", None) => Some(Input::Start),
        ("r", None) => Some(Input::Reveal),
        ("n", None) => Some(Input::Next),
        ("p", None) => Some(Input::Previous),
        ("g", Some(n)) => n.parse().ok().map(Input::Goto),
        ("f", None) => Some(Input::Finish),
        ("x", None) => Some(Input::Restart),
        ("o", None) => Some(Input::ToggleOrder),
        ("t", None) => Some(Input::ToggleTimer),
        ("secs", Some(n)) => n.parse().ok().map(Input::Seconds),
        ("h" | "?", None) => Some(Input::Help),
        ("q", None) => Some(Input::Quit),
        _ => None,
    }
}

/// Runs a session over stdin until the learner quits or stdin closes.
pub async fn run(
    study_loop: Arc<StudyLoopService>,
    deck_id: DeckId,
    config: SessionConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let (scheduler, mut ticks) = TokioTickScheduler::channel();
    let mut session = study_loop.start_session(deck_id, config, scheduler).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_help();
    render(&session.view());

    loop {
        tokio::select! {
            Some(token) = ticks.recv() => {
                let was_revealed = session.is_revealed();
                session.on_tick(token);
                if session.is_revealed() && !was_revealed {
                    println!("Time is up.");
                    render(&session.view());
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(input) = parse_input(&line) else {
                    println!("Unrecognised command: {}", line.trim());
                    print_help();
                    continue;
                };
                if input == Input::Quit {
                    break;
                }
                apply(&study_loop, &mut session, deck_id, input).await?;
                render(&session.view());
            }
        }
    }

    Ok(())
}

async fn apply<S: TickScheduler>(
    study_loop: &StudyLoopService,
    session: &mut StudySession<S>,
    deck_id: DeckId,
    input: Input,
) -> Result<(), Box<dyn std::error::Error>> {
    match input {
        Input::Start => {
            if session.phase() == SessionPhase::NotStarted {
                study_loop.start_from_config(session, deck_id).await?;
            }
        }
        Input::Reveal => session.reveal(),
        Input::Next => session.advance(Direction::Next),
        Input::Previous => session.advance(Direction::Previous),
        Input::Goto(n) => session.goto_index(n.saturating_sub(1)),
        Input::Finish => session.finish(),
        Input::Restart => session.restart(),
        Input::ToggleOrder => {
            let config = session.config();
            let order = match config.order_mode() {
                OrderMode::Ordered => OrderMode::Random,
                OrderMode::Random => OrderMode::Ordered,
            };
            session.set_config(SessionConfig::clamped(
                order,
                config.timed(),
                config.seconds_per_question(),
            ));
        }
        Input::ToggleTimer => {
            let config = session.config();
            session.set_config(SessionConfig::clamped(
                config.order_mode(),
                !config.timed(),
                config.seconds_per_question(),
            ));
        }
        Input::Seconds(seconds) => {
            let config = session.config();
            match SessionConfig::new(config.order_mode(), config.timed(), seconds) {
                Ok(updated) => session.set_config(updated),
                Err(err) => println!("{err}"),
            }
        }
        Input::Help => print_help(),
        Input::Quit => {}
    }
    Ok(())
}

fn print_help() {
    println!("Commands: r reveal, n next, p previous, g N go to card, f finish,");
    println!("          x back to setup, s start, o toggle order, t toggle timer,");
    println!("          secs N seconds per question, q quit");
}

fn render(view: &SessionView) {
    match view.phase {
        SessionPhase::NotStarted => {
            let config = view.config;
            let order = match config.order_mode() {
                OrderMode::Ordered => "ordered",
                OrderMode::Random => "random",
            };
            let timer = if config.timed() {
                format!("{}s per question", config.seconds_per_question())
            } else {
                "untimed".to_owned()
            };
            println!("Setup: {order}, {timer}. Press s to start.");
        }
        SessionPhase::Finished => {
            println!("Session complete. Press x to study again or q to quit.");
        }
        SessionPhase::InProgress => render_card(view),
    }
}

fn render_card(view: &SessionView) {
    let Some(card) = &view.card else {
        println!("This deck has no cards yet.");
        return;
    };

    let progress = view.progress;
    let mut header = format!(
        "[{}/{}] {}%",
        progress.position, progress.total, progress.percent
    );
    if let Some(remaining) = view.remaining_secs {
        header.push_str(&format!("  {remaining}s left"));
    }
    println!();
    println!("{header}");
    println!("Q: {}", card.question());
    if let Some(answer) = &view.answer {
        println!("A: {}", styled_answer(answer));
    }

    let controls = view.controls;
    let mut hints = Vec::new();
    if controls.previous {
        hints.push("p previous");
    }
    if controls.reveal {
        hints.push("r reveal");
    }
    if controls.next {
        hints.push("n next");
    }
    if controls.finish {
        hints.push("f finish");
    }
    if !hints.is_empty() {
        println!("({})", hints.join(", "));
    }
}

/// Underlines the filled-in part of the answer.
fn styled_answer(answer: &AnswerFace) -> String {
    answer
        .segments()
        .iter()
        .map(|segment| match segment {
            FaceSegment::Text(text) => text.clone(),
            FaceSegment::Filled(text) => format!("\x1b[4m{text}\x1b[0m"),
        })
        .collect()
}
