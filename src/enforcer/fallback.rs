//! Pre-written replies used when generation or enforcement keeps failing
//!
//! Every entry satisfies every enforcement rule on its own, so the student
//! never hears silence or an error message.

use crate::state_machine::{Language, State};

/// Safe reply for `state` in `language`
pub fn safe_fallback(state: State, language: Language) -> &'static str {
    match language {
        Language::Hinglish => hinglish(state),
        Language::Hindi => hindi(state),
        Language::English => english(state),
    }
}

fn hinglish(state: State) -> &'static str {
    match state {
        State::Greeting => "Namaste! Aaj hum saath mein padhenge.",
        State::Teaching => "Chalo isko ek aur tarike se samajhte hain.",
        State::AwaitingAnswer => "Aapka answer sunne mein problem aayi. Ek baar phir boliye.",
        State::Hinting => "Ek hint deti hoon, dhyan se sochiye.",
        State::Explaining => "Koi baat nahi, chalo saath mein solve karte hain.",
        State::Comfort => "Koi baat nahi. Thoda ruk ke phir try karenge.",
        State::SessionEnd => "Aaj ki padhai ho gayi. Kal phir milte hain!",
    }
}

fn hindi(state: State) -> &'static str {
    match state {
        State::Greeting => "नमस्ते! आज हम साथ में पढ़ेंगे।",
        State::Teaching => "चलो इसे एक और तरीके से समझते हैं।",
        State::AwaitingAnswer => "आपका उत्तर सुनने में दिक्कत आई। एक बार फिर बोलिए।",
        State::Hinting => "एक संकेत देती हूँ, ध्यान से सोचिए।",
        State::Explaining => "कोई बात नहीं, चलो साथ में हल करते हैं।",
        State::Comfort => "कोई बात नहीं। थोड़ा रुक कर फिर कोशिश करेंगे।",
        State::SessionEnd => "आज की पढ़ाई हो गई। कल फिर मिलते हैं!",
    }
}

fn english(state: State) -> &'static str {
    match state {
        State::Greeting => "Hello! Let us learn something together today.",
        State::Teaching => "Let us look at this in another way.",
        State::AwaitingAnswer => "I could not hear your answer. Please say it once more.",
        State::Hinting => "Here is a hint, think about it carefully.",
        State::Explaining => "No problem, let us solve it together.",
        State::Comfort => "That is okay. We can take a short pause and try again.",
        State::SessionEnd => "That is all for today. See you next time!",
    }
}
