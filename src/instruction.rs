//! Generation instructions and template replies
//!
//! The state machine decides what to say; this module turns that decision
//! into an instruction for the generator. A few actions never reach the
//! generator at all and are answered from fixed templates.

use crate::enforcer::Rule;
use crate::evaluator::Verdict;
use crate::state_machine::{Action, EndReason, Language, MetaTopic, SessionContext, State};
use std::fmt::Write;

/// Persona and hard rules shared by every instruction
const PERSONA: &str = r#"You are a warm, patient maths tutor for Class 8 students in India, speaking to one student over voice.

Sound like a caring older sister, not a chatbot. Be warm but keep the focus on learning.

Hard rules:
- At most two short sentences per reply.
- One idea per turn. Never explain and ask a question in the same reply.
- Use everyday Indian examples such as roti, cricket scores, Diwali shopping or train journeys.
- Write numbers and fractions in words, for example "minus one by seven". No symbols, slashes or brackets.
- Vary how you open each reply."#;

const NO_PRAISE: &str =
    "Do NOT praise. The student has not given a correct answer. No shabash, no well done, no very good.";
const PRAISE_OK: &str = "The student answered correctly. Praise briefly and refer to their exact answer.";

/// Instruction handed to the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub system: String,
    pub directive: String,
}

/// Everything the builder looks at for one turn
#[derive(Debug, Clone, Copy)]
pub struct TurnBrief<'a> {
    pub action: Action,
    /// State the reply is spoken in
    pub state: State,
    pub ctx: &'a SessionContext,
    pub verdict: Option<&'a Verdict>,
    pub student_utterance: &'a str,
    /// The tutor's previous reply
    pub previous: Option<&'a str>,
}

fn language_directive(language: Language) -> &'static str {
    match language {
        Language::Hinglish => {
            "Speak natural Hinglish: Hindi written in Roman script, mixed with common English words. Use the respectful aap form."
        }
        Language::Hindi => {
            "Speak only Hindi written in Devanagari script. Use the respectful aap form. Keep English words to a minimum."
        }
        Language::English => "Speak only simple Indian English. Do not use Hindi words or Devanagari script.",
    }
}

fn language_name(language: Language) -> &'static str {
    match language {
        Language::Hinglish => "Hinglish",
        Language::Hindi => "Hindi in Devanagari script",
        Language::English => "English",
    }
}

/// Build the generator instruction for a turn
pub fn build(brief: &TurnBrief<'_>) -> Instruction {
    let ctx = brief.ctx;
    let mut system = String::from(PERSONA);
    let _ = write!(system, "\n\nLanguage: {}", language_directive(ctx.language));
    let _ = write!(system, "\n\nLesson phase: {}. Topic: {}.", brief.state, ctx.topic);

    let correct = brief.verdict.is_some_and(Verdict::is_correct);
    let praise = if correct { PRAISE_OK } else { NO_PRAISE };
    let _ = write!(system, "\n\n{praise}");

    // Wrong answers already given to this question, so feedback does not
    // repeat itself
    if !ctx.wrong_attempts.is_empty() && ctx.question.is_some() {
        let _ = write!(
            system,
            "\n\nThe student's earlier wrong answers to this question: {}.",
            ctx.wrong_attempts
                .iter()
                .map(|a| format!("\"{a}\""))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Instruction {
        system,
        directive: directive(brief),
    }
}

#[allow(clippy::too_many_lines)] // one arm per action
fn directive(brief: &TurnBrief<'_>) -> String {
    let ctx = brief.ctx;
    let said = brief.student_utterance.trim();
    let question = ctx.question.as_ref();
    let prompt = question.map_or("", |q| q.prompt.as_str());
    let feedback = brief.verdict.map(|v| {
        format!(
            "The student said \"{said}\". Diagnosis: {}. Start by saying what they said.",
            v.describe()
        )
    });

    match brief.action {
        Action::Greet => format!(
            "Greet the student warmly and tell them today's topic is {}. Do not ask a maths question yet.",
            ctx.topic
        ),
        Action::StartTeaching => match question.and_then(|q| q.material(0)) {
            Some(material) => format!(
                "Teach this idea in simple words: \"{material}\". Do not ask a question."
            ),
            None => format!(
                "Teach one basic idea about {} with an everyday example. Do not ask a question.",
                ctx.topic
            ),
        },
        Action::Reteach { material_index } => {
            let mut out = String::from("The student did not follow. Explain again with a completely different example");
            if let Some(material) = question.and_then(|q| q.material(material_index)) {
                let _ = write!(out, ", built on this: \"{material}\"");
            }
            out.push('.');
            if let Some(previous) = brief.previous {
                let _ = write!(out, " Do not reuse your previous wording: \"{previous}\".");
            }
            out.push_str(" Do not ask a question.");
            out
        }
        Action::AskQuestion { forced: true } => format!(
            "Say kindly that trying is the best way to learn, then ask: \"{prompt}\""
        ),
        Action::AskQuestion { forced: false } => {
            format!("Ask this question naturally: \"{prompt}\"")
        }
        Action::RereadQuestion => format!("Read the question again, slowly: \"{prompt}\""),
        Action::GiveHint { level } => {
            let mut out = feedback.map(|f| format!("{f} ")).unwrap_or_default();
            match question.and_then(|q| q.hint(level)) {
                Some(hint) => {
                    let _ = write!(out, "Give hint {level}: \"{hint}\".");
                }
                None => out.push_str("Give a small hint: look at the numerators first, then the denominators."),
            }
            out.push_str(" Do not reveal the answer. Ask them to try again.");
            out
        }
        Action::PartialGuidance => format!(
            "{} Acknowledge the part that is right, point at what is missing, and do not reveal the answer.",
            feedback.unwrap_or_else(|| format!("The student said \"{said}\"."))
        ),
        Action::RevealSolution => {
            let solution = question.map_or("", |q| q.solution.as_str());
            let mut out = feedback.map(|f| format!("{f} ")).unwrap_or_default();
            let _ = write!(
                out,
                "Walk through the solution calmly: \"{solution}\". Reassure them. Do not ask a new question."
            );
            out
        }
        Action::AdvanceQuestion => {
            if brief.verdict.is_some_and(Verdict::is_correct) {
                format!(
                    "The student said \"{said}\", which is correct. Praise in a few words, then ask the next question: \"{prompt}\""
                )
            } else {
                format!("Move on to the next question: \"{prompt}\"")
            }
        }
        Action::Comfort => format!(
            "The student said \"{said}\" and is upset. Acknowledge the feeling kindly and tell them to say when they are ready. Do not teach and do not ask a question."
        ),
        Action::Resume { to } => match (to, question) {
            (State::AwaitingAnswer | State::Hinting, Some(q)) => format!(
                "The student is ready again. Continue gently by reading the question: \"{}\"",
                q.prompt
            ),
            _ => format!(
                "The student is ready again. Continue gently with {} using a fresh everyday example.",
                ctx.topic
            ),
        },
        Action::ReissueInLanguage { language } => match brief.previous {
            Some(previous) => format!(
                "Say your previous message again in {}: \"{previous}\"",
                language_name(language)
            ),
            None => format!(
                "Continue the lesson on {} in {}.",
                ctx.topic,
                language_name(language)
            ),
        },
        Action::AnswerMeta { .. }
        | Action::AskRepeat { .. }
        | Action::EndSession { .. }
        | Action::Farewell => match templated_reply(brief.action, ctx) {
            Some(reply) => format!("Say exactly: \"{reply}\""),
            None => "Continue the lesson.".to_string(),
        },
        Action::Evaluate => "Continue the lesson.".to_string(),
    }
}

/// Append the rules the previous attempt broke
pub fn with_corrections(directive: &str, violations: &[Rule]) -> String {
    if violations.is_empty() {
        return directive.to_string();
    }
    let mut out = format!("{directive}\n\nYour previous attempt broke these rules:");
    for rule in violations {
        let _ = write!(out, "\n- {rule}: {}", rule.correction());
    }
    out
}

/// Fixed reply for actions that bypass the generator
pub fn templated_reply(action: Action, ctx: &SessionContext) -> Option<String> {
    match action {
        Action::AnswerMeta { topic } => Some(meta_reply(topic, ctx)),
        Action::AskRepeat { attempt } => Some(repeat_prompt(attempt, ctx.language).to_string()),
        Action::EndSession { reason } => Some(end_reply(reason, ctx)),
        Action::Farewell => Some(farewell(ctx.language).to_string()),
        _ => None,
    }
}

fn meta_reply(topic: MetaTopic, ctx: &SessionContext) -> String {
    let (asked, score, name) = (ctx.questions_asked, ctx.score, ctx.topic.as_str());
    match (topic, ctx.language) {
        (MetaTopic::Chapter, Language::Hinglish) => format!("Yeh chapter {name} ka hai."),
        (MetaTopic::Chapter, Language::Hindi) => format!("यह अध्याय {name} का है।"),
        (MetaTopic::Chapter, Language::English) => format!("This chapter is about {name}."),
        (MetaTopic::Topic, Language::Hinglish) => format!("Hum abhi {name} padh rahe hain."),
        (MetaTopic::Topic, Language::Hindi) => format!("हम अभी {name} पढ़ रहे हैं।"),
        (MetaTopic::Topic, Language::English) => format!("We are studying {name} right now."),
        (MetaTopic::Subject, Language::Hinglish) => "Abhi hum Maths padh rahe hain.".to_string(),
        (MetaTopic::Subject, Language::Hindi) => "अभी हम गणित पढ़ रहे हैं।".to_string(),
        (MetaTopic::Subject, Language::English) => "We are doing Maths right now.".to_string(),
        (MetaTopic::Progress, Language::Hinglish) => {
            format!("Ab tak {asked} sawaal hue, aur {score} sahi the.")
        }
        (MetaTopic::Progress, Language::Hindi) => {
            format!("अब तक {asked} सवाल हुए, और {score} सही थे।")
        }
        (MetaTopic::Progress, Language::English) => {
            format!("So far we have done {asked} questions, and {score} were right.")
        }
    }
}

fn repeat_prompt(attempt: u8, language: Language) -> &'static str {
    match (attempt, language) {
        (0 | 1, Language::Hinglish) => "Sorry, samajh nahi aaya. Ek baar phir boliye.",
        (0 | 1, Language::Hindi) => "माफ़ कीजिए, समझ नहीं आया। एक बार फिर बोलिए।",
        (0 | 1, Language::English) => "Sorry, I did not catch that. Please say it again.",
        (2, Language::Hinglish) => "Awaaz saaf nahi aayi. Thoda dheere aur zor se boliye.",
        (2, Language::Hindi) => "आवाज़ साफ़ नहीं आई। थोड़ा धीरे और ज़ोर से बोलिए।",
        (2, Language::English) => "I still could not hear you clearly. Please speak a little slower and louder.",
        (_, Language::Hinglish) => "Koi baat nahi. Aap sirf number boliye, ya pata nahi boliye.",
        (_, Language::Hindi) => "कोई बात नहीं। आप सिर्फ़ संख्या बोलिए, या पता नहीं बोलिए।",
        (_, Language::English) => "No problem. Just say the number, or say I don't know.",
    }
}

fn end_reply(reason: EndReason, ctx: &SessionContext) -> String {
    let (asked, score) = (ctx.questions_asked, ctx.score);
    match ctx.language {
        Language::Hinglish => {
            let opening = match reason {
                EndReason::Stopped => "Theek hai, aaj yahin rukte hain.",
                EndReason::TimeLimit => "Aaj ka time ho gaya.",
                EndReason::Completed => "Aaj ke saare sawaal ho gaye.",
                EndReason::ContentExhausted => "Is topic ke saare sawaal ho gaye.",
            };
            format!("{opening} Aapne {asked} mein se {score} sawaal sahi kiye, kal phir milte hain!")
        }
        Language::Hindi => {
            let opening = match reason {
                EndReason::Stopped => "ठीक है, आज यहीं रुकते हैं।",
                EndReason::TimeLimit => "आज का समय पूरा हो गया।",
                EndReason::Completed => "आज के सारे सवाल हो गए।",
                EndReason::ContentExhausted => "इस विषय के सारे सवाल हो गए।",
            };
            format!("{opening} आपने {asked} में से {score} सवाल सही किए, कल फिर मिलते हैं!")
        }
        Language::English => {
            let opening = match reason {
                EndReason::Stopped => "Okay, let us stop here for today.",
                EndReason::TimeLimit => "That is all the time we have today.",
                EndReason::Completed => "We have finished today's questions.",
                EndReason::ContentExhausted => "We have done every question on this topic.",
            };
            format!("{opening} You got {score} out of {asked} right, see you tomorrow!")
        }
    }
}

fn farewell(language: Language) -> &'static str {
    match language {
        Language::Hinglish => "Aaj ka session khatam ho gaya. Kal phir milte hain!",
        Language::Hindi => "आज का सत्र खत्म हो गया। कल फिर मिलते हैं!",
        Language::English => "Today's session is over. See you tomorrow!",
    }
}
