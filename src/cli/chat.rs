use std::io::Write;

use anyhow::Result;
use futures_util::StreamExt;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::chat::ChatGateway;
use crate::core::AppConfig;
use crate::kv;
use crate::openai::{Message, Role};
use crate::transcript::{
    Block, ChatSession, CopyToClipboard, MessageEditor, SaveOutcome, Segment, TYPING_CURSOR,
    TerminalClipboard, TranscriptRenderer,
};

const HELP: &str = "Commands: /history, /edit <n>, /copy, /help. Ctrl-D to quit.";

#[derive(Debug, PartialEq)]
enum Input<'a> {
    Say(&'a str),
    Edit(usize),
    Copy,
    History,
    Help,
}

fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    match trimmed.split_once(' ').unwrap_or((trimmed, "")) {
        ("/history", _) => Input::History,
        ("/copy", _) => Input::Copy,
        ("/help", _) => Input::Help,
        ("/edit", n) => match n.trim().parse() {
            Ok(n) => Input::Edit(n),
            Err(_) => Input::Help,
        },
        _ => Input::Say(line),
    }
}

fn print_block(index: Option<usize>, block: &Block) {
    let who = match (block.role.clone(), index) {
        (Role::User, Some(n)) => format!("you [{n}]"),
        (Role::User, None) => String::from("you"),
        _ => String::from("assistant"),
    };
    println!("{who}:");
    for segment in &block.segments {
        match segment {
            Segment::Text(text) | Segment::Markdown(text) => println!("{text}"),
            Segment::Code {
                language,
                highlighted,
                ..
            } => println!("```{language}\n{highlighted}\n```"),
            Segment::Cursor => println!("{TYPING_CURSOR}"),
        }
    }
    println!();
}

fn print_history(session: &ChatSession, renderer: &TranscriptRenderer) {
    let mut user_turn = 0;
    for block in renderer.render_transcript(session.messages()) {
        let index = (block.role == Role::User).then(|| {
            user_turn += 1;
            user_turn
        });
        print_block(index, &block);
    }
}

/// The `n`th user turn, counting from 1 the way `/history` numbers them
fn nth_user_turn(messages: &[Message], n: usize) -> Option<&Message> {
    let index = n.checked_sub(1)?;
    messages.iter().filter(|m| m.role == Role::User).nth(index)
}

/// Streams the next reply into the session, printing tokens as they
/// arrive.
async fn respond(
    gateway: &ChatGateway,
    session: &mut ChatSession,
    history: Vec<Message>,
) -> Result<()> {
    let chat_stream = match gateway.stream(history, None).await {
        Ok(chat_stream) => chat_stream,
        Err(e) => {
            session.fail();
            println!("Error: {}", e);
            return Ok(());
        }
    };

    let mut stdout = std::io::stdout();
    let mut tokens = std::pin::pin!(chat_stream.into_stream());
    while let Some(token) = tokens.next().await {
        match token {
            Ok(token) => {
                print!("{token}");
                stdout.flush()?;
                session.append_token(&token);
            }
            Err(e) => {
                session.fail();
                println!("\nError: {}", e);
                return Ok(());
            }
        }
    }
    println!("\n");
    session.finish();

    Ok(())
}

/// Lets the user rework one of their earlier turns. Returns the
/// updated turn when it was saved.
fn edit_turn(rl: &mut DefaultEditor, message: Message) -> Result<Option<Message>> {
    let mut editor = MessageEditor::new(message);
    if !editor.start_edit() {
        println!("Only your own messages can be edited");
        return Ok(None);
    }

    let mut edited = None;
    while editor.is_editing() {
        let draft = editor.draft().unwrap_or_default().to_string();
        match rl.readline_with_initial("edit> ", (draft.as_str(), "")) {
            Ok(line) => {
                editor.update_draft(line);
                match editor.save(|m| edited = Some(m)) {
                    SaveOutcome::Saved | SaveOutcome::NotEditing => {}
                    SaveOutcome::Empty => println!("Message can't be empty"),
                    SaveOutcome::Unchanged => {
                        println!("Nothing changed");
                        editor.cancel_edit();
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => editor.cancel_edit(),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(edited)
}

pub async fn run(config: AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    let gateway = ChatGateway::from_config(&config, kv::from_config(&config));
    let renderer: TranscriptRenderer = TranscriptRenderer::default();
    let mut copier = CopyToClipboard::new(TerminalClipboard);
    let mut session = ChatSession::new();

    println!("{HELP}\n");

    // The persona opens the conversation
    let history = session.reload()?;
    respond(&gateway, &mut session, history).await?;

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => match parse_input(&line) {
                Input::Say(text) => match session.submit(text) {
                    Ok(history) => {
                        rl.add_history_entry(text)?;
                        respond(&gateway, &mut session, history).await?;
                    }
                    Err(e) => println!("{}", e),
                },
                Input::Edit(n) => {
                    let Some(message) = nth_user_turn(session.messages(), n).cloned() else {
                        println!("No message [{n}], see /history");
                        continue;
                    };
                    if let Some(updated) = edit_turn(&mut rl, message)? {
                        let history = session.apply_edit(updated)?;
                        respond(&gateway, &mut session, history).await?;
                    }
                }
                Input::Copy => match session.last_reply() {
                    Some(reply) => {
                        if !copier.copy_to_clipboard(&reply.content)? {
                            println!("Already copied");
                        }
                    }
                    None => println!("Nothing to copy yet"),
                },
                Input::History => print_history(&session, &renderer),
                Input::Help => println!("{HELP}"),
            },
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
