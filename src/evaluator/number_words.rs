//! Spoken number vocabularies (English and Hindi, Roman and Devanagari)

/// How a number word combines with its neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberWord {
    /// zero through nine
    Unit(u64),
    /// ten through nineteen
    Teen(u64),
    /// twenty, thirty, ... ninety
    Tens(u64),
    Hundred,
    /// A complete value that never combines (Hindi numerals)
    Whole(u64),
}

pub fn number_word(word: &str) -> Option<NumberWord> {
    english(word).or_else(|| hindi(word).map(NumberWord::Whole))
}

fn english(word: &str) -> Option<NumberWord> {
    let word = match word {
        "zero" => NumberWord::Unit(0),
        "one" => NumberWord::Unit(1),
        "two" => NumberWord::Unit(2),
        "three" => NumberWord::Unit(3),
        "four" => NumberWord::Unit(4),
        "five" => NumberWord::Unit(5),
        "six" => NumberWord::Unit(6),
        "seven" => NumberWord::Unit(7),
        "eight" => NumberWord::Unit(8),
        "nine" => NumberWord::Unit(9),
        "ten" => NumberWord::Teen(10),
        "eleven" => NumberWord::Teen(11),
        "twelve" => NumberWord::Teen(12),
        "thirteen" => NumberWord::Teen(13),
        "fourteen" => NumberWord::Teen(14),
        "fifteen" => NumberWord::Teen(15),
        "sixteen" => NumberWord::Teen(16),
        "seventeen" => NumberWord::Teen(17),
        "eighteen" => NumberWord::Teen(18),
        "nineteen" => NumberWord::Teen(19),
        "twenty" => NumberWord::Tens(20),
        "thirty" => NumberWord::Tens(30),
        "forty" | "fourty" => NumberWord::Tens(40),
        "fifty" => NumberWord::Tens(50),
        "sixty" => NumberWord::Tens(60),
        "seventy" => NumberWord::Tens(70),
        "eighty" => NumberWord::Tens(80),
        "ninety" => NumberWord::Tens(90),
        "hundred" => NumberWord::Hundred,
        _ => return None,
    };
    Some(word)
}

fn hindi(word: &str) -> Option<u64> {
    let n = match word {
        "shunya" | "sunya" | "शून्य" => 0,
        "ek" | "एक" => 1,
        "do" | "दो" => 2,
        "teen" | "तीन" => 3,
        "char" | "chaar" | "चार" => 4,
        "paanch" | "panch" | "पांच" | "पाँच" => 5,
        "chhe" | "cheh" | "chheh" | "छह" | "छे" => 6,
        "saat" | "सात" => 7,
        "aath" | "आठ" => 8,
        "nau" | "नौ" => 9,
        "das" | "दस" => 10,
        "gyarah" | "ग्यारह" => 11,
        "barah" | "baara" | "बारह" => 12,
        "terah" | "तेरह" => 13,
        "chaudah" | "चौदह" => 14,
        "pandrah" | "पंद्रह" => 15,
        "solah" | "सोलह" => 16,
        "satrah" | "सत्रह" => 17,
        "atharah" | "athaara" | "अठारह" => 18,
        "unnis" | "unees" | "उन्नीस" => 19,
        "bees" | "बीस" => 20,
        "ekkees" | "इक्कीस" => 21,
        "baees" | "बाईस" => 22,
        "tees" | "तीस" => 30,
        "chawalees" | "chavalees" | "चवालीस" => 44,
        "pachaas" | "पचास" => 50,
        "saath" | "साठ" => 60,
        "sattar" | "सत्तर" => 70,
        "assi" | "अस्सी" => 80,
        "nabbe" | "नब्बे" => 90,
        "sau" | "सौ" => 100,
        "hazaar" | "हज़ार" => 1000,
        _ => return None,
    };
    Some(n)
}

/// Denominator named by a fraction word ("third" -> 3)
pub fn fraction_word(word: &str) -> Option<i64> {
    let den = match word {
        "half" | "halves" | "aadha" | "आधा" => 2,
        "third" | "thirds" | "tihaayi" | "तिहाई" => 3,
        "quarter" | "quarters" | "fourth" | "fourths" | "chauthai" | "चौथाई" => 4,
        "fifth" | "fifths" | "paanchva" => 5,
        "sixth" | "sixths" => 6,
        "seventh" | "sevenths" => 7,
        "eighth" | "eighths" => 8,
        "ninth" | "ninths" => 9,
        "tenth" | "tenths" => 10,
        _ => return None,
    };
    Some(den)
}

/// Devanagari spellings of English words, as speech recognizers emit them
pub fn phonetic_english(word: &str) -> Option<&'static str> {
    let english = match word {
        "वन" | "वान" => "one",
        "टू" | "तू" => "two",
        "थ्री" | "थ्रे" => "three",
        "फोर" | "फ़ोर" => "four",
        "फाइव" | "फ़ाइव" => "five",
        "सिक्स" => "six",
        "सेवन" | "सेव्हन" => "seven",
        "एट" | "ऐट" => "eight",
        "नाइन" | "नाईन" => "nine",
        "टेन" => "ten",
        "बाई" | "बाइ" | "बाय" => "by",
        "माइनस" | "मिनस" | "मैनस" => "minus",
        "प्लस" => "plus",
        "ओवर" => "over",
        "अपॉन" => "upon",
        _ => return None,
    };
    Some(english)
}

/// Spoken operator words mapped to their symbol
pub fn operator_word(word: &str) -> Option<&'static str> {
    let symbol = match word {
        "by" | "over" | "upon" | "baata" | "bata" => "/",
        "plus" | "add" => "+",
        "minus" | "negative" | "neg" => "-",
        "into" | "times" | "multiply" | "guna" => "*",
        "equals" | "equal" | "is" | "barabar" => "=",
        _ => return None,
    };
    Some(symbol)
}

/// Two-word operators, checked before the single-word table
pub fn operator_pair(first: &str, second: &str) -> Option<&'static str> {
    match (first, second) {
        ("divided", "by") => Some("/"),
        ("multiplied", "by") => Some("*"),
        ("equal", "to") | ("equals", "to") => Some("="),
        _ => None,
    }
}
