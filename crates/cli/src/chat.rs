//! Interactive study session

use crate::commands::App;
use crate::render::confidence_bar;
use anyhow::Result;
use papermind_common::db::models::{AgentKind, ChatRole};
use papermind_study::{AssessmentOutcome, AssessmentStatus, StudySession};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Messages replayed when resuming a chat
const HISTORY_SHOWN: usize = 6;

/// One line of user input
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Message(&'a str),
    Switch(AgentKind),
    Assess,
    Quit,
    Help,
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Empty,
        "/teach" => Input::Switch(AgentKind::Teach),
        "/zealot" => Input::Switch(AgentKind::Zealot),
        "/assess" => Input::Assess,
        "/quit" | "/exit" => Input::Quit,
        "/help" => Input::Help,
        text => Input::Message(text),
    }
}

pub async fn run(app: &App, paper_id: i64, agent: AgentKind, new: bool) -> Result<()> {
    let study = app.study()?;
    let mut session = if new {
        study.new_session(paper_id, agent).await?
    } else {
        study.open_for_paper(paper_id, agent).await?
    };

    println!(
        "Studying \"{}\" (chat {}). Commands: /teach /zealot /assess /quit",
        session.paper().title,
        session.chat_id()
    );
    replay_history(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = std::io::stdout();
    loop {
        prompt(&mut out, session.agent())?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if !handle(&mut session, parse_input(&line), &mut out).await? {
            break;
        }
    }

    Ok(())
}

/// Apply one line of input; `false` ends the session
async fn handle<W: Write>(session: &mut StudySession, input: Input<'_>, out: &mut W) -> Result<bool> {
    match input {
        Input::Empty => {}
        Input::Quit => return Ok(false),
        Input::Help => writeln!(out, "/teach, /zealot switch persona; /assess scores your answers; /quit leaves")?,
        Input::Switch(next) => {
            session.set_agent(next);
            writeln!(out, "Switched to {}", next)?;
        }
        Input::Assess => match session.assess_now().await {
            Ok(Some(outcome)) => print_assessment(out, &outcome)?,
            Ok(None) => writeln!(out, "Answer a few of the examiner's questions first.")?,
            Err(e) => writeln!(out, "(assessment failed: {})", e)?,
        },
        Input::Message(text) => {
            let reply = session
                .send_message(text, |token| {
                    let _ = write!(out, "{}", token);
                    let _ = out.flush();
                })
                .await?;
            if reply.failed {
                writeln!(out, "{}", reply.content)?;
            } else {
                writeln!(out)?;
            }
            match reply.assessment {
                AssessmentStatus::NotDue => {}
                AssessmentStatus::Completed(outcome) => print_assessment(out, &outcome)?,
                AssessmentStatus::Failed(e) => writeln!(out, "(assessment failed: {})", e)?,
            }
        }
    }
    Ok(true)
}

fn prompt<W: Write>(out: &mut W, agent: AgentKind) -> std::io::Result<()> {
    write!(out, "\n[{}] you> ", agent)?;
    out.flush()
}

fn replay_history(session: &StudySession) {
    let messages = session.messages();
    let skip = messages.len().saturating_sub(HISTORY_SHOWN);
    if skip > 0 {
        println!("... {} earlier messages", skip);
    }
    for message in &messages[skip..] {
        match message.role {
            ChatRole::User => println!("\nyou> {}", message.content),
            ChatRole::Assistant => {
                let agent = message.agent.unwrap_or_default();
                println!("\n{}> {}", agent, message.content);
            }
        }
    }
}

fn print_assessment<W: Write>(out: &mut W, outcome: &AssessmentOutcome) -> std::io::Result<()> {
    if outcome.updated.is_empty() {
        return writeln!(out, "(assessment found nothing to score)");
    }
    writeln!(out, "\nKnowledge updated:")?;
    for score in &outcome.updated {
        writeln!(out, "  {:<32} {}", score.name, confidence_bar(score.confidence))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use papermind_common::config::{DatabaseConfig, LlmConfig, StudyConfig};
    use papermind_common::db::{NewConcept, NewPaper, PaperRecord};
    use papermind_common::llm::ScriptedLlm;
    use papermind_common::{DbPool, LlmService, Repository};
    use papermind_study::StudyService;
    use std::sync::Arc;

    async fn zealot_session(config: StudyConfig) -> (StudySession, Arc<ScriptedLlm>) {
        let repository = Repository::new(DbPool::new(&DatabaseConfig::in_memory()).await.unwrap());
        let paper = repository
            .record_paper(PaperRecord {
                paper: NewPaper {
                    title: "Deep Residual Learning".into(),
                    authors: vec!["He".into()],
                    abstract_text: String::new(),
                    summary: String::new(),
                    source_url: "resnet.pdf".into(),
                    raw_text: String::new(),
                },
                concepts: vec![NewConcept {
                    name: "Residual Connection".into(),
                    description: "Adds the input back to the output".into(),
                }],
                links: vec![],
            })
            .await
            .unwrap()
            .paper;

        let llm = Arc::new(ScriptedLlm::new());
        let study = StudyService::new(
            repository,
            LlmService::new(llm.clone(), &LlmConfig::default()),
            config,
        );
        let session = study.new_session(paper.id, AgentKind::Zealot).await.unwrap();
        (session, llm)
    }

    fn text(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  "), Input::Empty);
        assert_eq!(parse_input("/zealot"), Input::Switch(AgentKind::Zealot));
        assert_eq!(parse_input(" /teach "), Input::Switch(AgentKind::Teach));
        assert_eq!(parse_input("/assess"), Input::Assess);
        assert_eq!(parse_input("/exit"), Input::Quit);
        assert_eq!(parse_input(" why residuals? "), Input::Message("why residuals?"));
    }

    #[tokio::test]
    async fn test_failed_manual_assessment_keeps_session_open() {
        let (mut session, llm) = zealot_session(StudyConfig::default()).await;
        llm.push_reply("What does the shortcut add?");
        for _ in 0..3 {
            llm.push_reply("not json");
        }

        let mut out = Vec::new();
        assert!(handle(&mut session, Input::Message("ready"), &mut out).await.unwrap());
        assert!(handle(&mut session, Input::Assess, &mut out).await.unwrap());

        let shown = text(out);
        assert!(shown.contains("What does the shortcut add?"));
        assert!(shown.contains("(assessment failed: "));
        assert_eq!(llm.request_count(), 4);
    }

    #[tokio::test]
    async fn test_failed_auto_assessment_is_reported() {
        let config = StudyConfig {
            assessment_threshold: 2,
            ..StudyConfig::default()
        };
        let (mut session, llm) = zealot_session(config).await;
        llm.push_reply("Why not learn the mapping directly?");
        for _ in 0..3 {
            llm.push_reply("not json");
        }

        let mut out = Vec::new();
        assert!(handle(&mut session, Input::Message("ready"), &mut out).await.unwrap());

        let shown = text(out);
        assert!(shown.contains("Why not learn the mapping directly?"));
        assert!(shown.contains("(assessment failed: "));
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_quit_and_switch() {
        let (mut session, llm) = zealot_session(StudyConfig::default()).await;
        let mut out = Vec::new();

        assert!(handle(&mut session, Input::Switch(AgentKind::Teach), &mut out).await.unwrap());
        assert_eq!(session.agent(), AgentKind::Teach);
        assert!(handle(&mut session, Input::Assess, &mut out).await.unwrap());
        assert!(!handle(&mut session, Input::Quit, &mut out).await.unwrap());

        let shown = text(out);
        assert!(shown.contains("Switched to teach"));
        assert!(shown.contains("Answer a few of the examiner's questions first."));
        assert_eq!(llm.request_count(), 0);
    }
}
