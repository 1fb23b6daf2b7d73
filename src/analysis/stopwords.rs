//! Stop word lists for the `<lang>_text` analyzers, derived from the
//! Snowball project lists (most frequent function words per language).

use crate::analysis::language::Language;

pub fn stop_words(language: Language) -> &'static [&'static str] {
    match language {
        Language::English => ENGLISH,
        Language::French => FRENCH,
        Language::German => GERMAN,
        Language::Spanish => SPANISH,
        Language::Italian => ITALIAN,
        Language::Portuguese => PORTUGUESE,
        Language::Russian => RUSSIAN,
        Language::Arabic => ARABIC,
        Language::Danish => DANISH,
        Language::Dutch => DUTCH,
        Language::Finnish => FINNISH,
        Language::Greek => GREEK,
        Language::Hungarian => HUNGARIAN,
        Language::Norwegian => NORWEGIAN,
        Language::Romanian => ROMANIAN,
        Language::Swedish => SWEDISH,
        Language::Tamil => TAMIL,
        Language::Turkish => TURKISH,
    }
}

const ENGLISH: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

const FRENCH: &[&str] = &[
    "au", "aux", "avec", "ce", "ces", "dans", "de", "des", "du", "elle", "en", "et", "eux", "il",
    "je", "la", "le", "les", "leur", "lui", "ma", "mais", "me", "même", "mes", "moi", "mon", "ne",
    "nos", "notre", "nous", "on", "ou", "par", "pas", "pour", "qu", "que", "qui", "sa", "se",
    "ses", "son", "sur", "ta", "te", "tes", "toi", "ton", "tu", "un", "une", "vos", "votre",
    "vous",
];

const GERMAN: &[&str] = &[
    "aber", "alle", "als", "also", "am", "an", "auch", "auf", "aus", "bei", "bin", "bis", "bist",
    "da", "damit", "das", "dass", "dein", "dem", "den", "der", "des", "die", "doch", "dort", "du",
    "durch", "ein", "eine", "einem", "einen", "einer", "eines", "er", "es", "für", "hab", "habe",
    "haben", "hat", "hatte", "hier", "ich", "ihr", "im", "in", "ist", "ja", "kann", "mein", "mit",
    "nach", "nicht", "noch", "nun", "nur", "oder", "schon", "sein", "sich", "sie", "sind", "so",
    "über", "um", "und", "uns", "von", "vor", "war", "was", "wenn", "wie", "wir", "wird", "zu",
    "zum", "zur",
];

const SPANISH: &[&str] = &[
    "a", "al", "algo", "como", "con", "de", "del", "donde", "el", "ella", "ellas", "ellos", "en",
    "era", "es", "esta", "este", "esto", "fue", "ha", "hay", "la", "las", "le", "lo", "los",
    "más", "me", "mi", "muy", "no", "nos", "o", "para", "pero", "por", "que", "se", "si", "sin",
    "sobre", "su", "sus", "también", "te", "tiene", "un", "una", "uno", "y", "ya", "yo",
];

const ITALIAN: &[&str] = &[
    "a", "ad", "al", "alla", "anche", "che", "chi", "ci", "come", "con", "cui", "da", "dei",
    "del", "della", "di", "e", "ed", "era", "gli", "ha", "hanno", "ho", "i", "il", "in", "io",
    "la", "le", "lei", "lo", "loro", "lui", "ma", "mi", "ne", "noi", "non", "nostro", "o", "per",
    "più", "quella", "quello", "questa", "questo", "se", "si", "sono", "su", "sua", "sui", "suo",
    "tra", "tu", "tutto", "un", "una", "uno", "voi",
];

const PORTUGUESE: &[&str] = &[
    "a", "ao", "aos", "as", "com", "como", "da", "das", "de", "dela", "dele", "do", "dos", "e",
    "ela", "ele", "em", "entre", "era", "essa", "esse", "esta", "este", "eu", "foi", "há",
    "isso", "isto", "já", "mais", "mas", "me", "mesmo", "meu", "minha", "muito", "na", "não",
    "nas", "no", "nos", "nós", "o", "os", "ou", "para", "pela", "pelo", "por", "qual", "quando",
    "que", "quem", "se", "sem", "seu", "sua", "só", "também", "te", "tem", "um", "uma", "você",
];

const RUSSIAN: &[&str] = &[
    "а", "без", "бы", "был", "была", "были", "было", "быть", "в", "вам", "вас", "весь", "во",
    "вот", "все", "всех", "вы", "да", "для", "до", "его", "ее", "ей", "ему", "если", "есть",
    "еще", "же", "за", "здесь", "и", "из", "или", "им", "их", "к", "как", "ко", "когда", "кто",
    "ли", "либо", "мне", "может", "мы", "на", "надо", "наш", "не", "него", "нее", "нет", "ни",
    "них", "но", "ну", "о", "об", "он", "она", "они", "оно", "от", "по", "под", "при", "с",
    "со", "так", "также", "такой", "там", "те", "тем", "то", "того", "тоже", "той", "только",
    "том", "ты", "у", "уже", "хотя", "чего", "чей", "чем", "что", "чтобы", "чье", "эта", "эти",
    "это", "я",
];

const ARABIC: &[&str] = &[
    "من", "في", "على", "و", "فى", "يا", "عن", "مع", "ان", "هذا", "هذه", "ذلك", "تلك", "هو",
    "هي", "انه", "كان", "كانت", "لم", "لن", "لا", "ما", "اذا", "كل", "بعد", "قبل", "قد", "ثم",
    "او", "أو", "بين", "حتى", "اي", "الى", "إلى", "التي", "الذي", "الذين", "ليس", "كما", "لها",
    "له", "منذ", "نحو", "هنا", "هناك",
];

const DANISH: &[&str] = &[
    "af", "alle", "at", "blev", "da", "de", "den", "denne", "der", "det", "dette", "dig", "din",
    "dog", "du", "efter", "eller", "en", "end", "er", "et", "for", "fra", "ham", "han", "hans",
    "har", "havde", "hende", "hun", "hvad", "hvis", "hvor", "i", "ikke", "ind", "jeg", "kan",
    "man", "med", "meget", "men", "mig", "min", "når", "nu", "og", "også", "om", "op", "os",
    "over", "på", "sig", "skal", "skulle", "som", "så", "til", "ud", "under", "var", "vi", "vil",
    "ville", "være",
];

const DUTCH: &[&str] = &[
    "aan", "al", "als", "bij", "dan", "dat", "de", "der", "deze", "die", "dit", "doch", "door",
    "dus", "een", "en", "er", "ge", "geen", "had", "heb", "hebben", "heeft", "hem", "het", "hier",
    "hij", "hoe", "hun", "iets", "ik", "in", "is", "ja", "je", "kan", "kon", "kunnen", "maar",
    "me", "meer", "men", "met", "mij", "mijn", "moet", "na", "naar", "niet", "niets", "nog", "nu",
    "of", "om", "omdat", "onder", "ons", "ook", "op", "over", "reeds", "te", "tegen", "toch",
    "toen", "tot", "u", "uit", "uw", "van", "veel", "voor", "want", "waren", "was", "wat", "we",
    "wel", "werd", "wie", "wij", "wil", "worden", "zal", "ze", "zei", "zich", "zij", "zijn", "zo",
    "zonder", "zou",
];

const FINNISH: &[&str] = &[
    "ei", "en", "että", "he", "hän", "ja", "jo", "jos", "kanssa", "kun", "me", "minä", "mitä",
    "mukaan", "mutta", "myös", "ne", "niin", "nyt", "ole", "oli", "olla", "on", "ovat", "se",
    "sen", "sinä", "sitä", "tai", "te", "tämä", "vaan", "vain", "voi",
];

const GREEK: &[&str] = &[
    "αι", "αλλά", "από", "αυτά", "αυτή", "αυτό", "αυτός", "για", "δε", "δεν", "εγώ", "είμαι",
    "είναι", "εκείνος", "εμείς", "εσύ", "έχει", "έχω", "η", "ήταν", "θα", "και", "κατά", "με",
    "μετά", "μη", "μια", "να", "ο", "οι", "όπως", "ότι", "ου", "πολύ", "που", "προς", "πως",
    "σε", "στη", "στο", "τα", "την", "της", "τι", "τις", "το", "τον", "του", "τους", "των", "ως",
];

const HUNGARIAN: &[&str] = &[
    "a", "az", "azt", "be", "csak", "de", "egy", "el", "és", "ez", "ezt", "fel", "hogy", "igen",
    "ill", "is", "ki", "le", "lesz", "meg", "mert", "mi", "mint", "már", "nagy", "ne", "nem",
    "ő", "ők", "pedig", "s", "te", "úgy", "van", "volt",
];

const NORWEGIAN: &[&str] = &[
    "å", "alle", "at", "av", "da", "de", "den", "denne", "der", "det", "dette", "du", "eller",
    "en", "er", "et", "etter", "for", "fra", "ham", "han", "hans", "har", "hun", "hva", "hvis",
    "hvor", "i", "ikke", "jeg", "kan", "man", "med", "men", "min", "mot", "nå", "når", "og",
    "også", "om", "opp", "oss", "over", "på", "seg", "sin", "skal", "skulle", "som", "så", "til",
    "ut", "var", "vi", "vil", "ville", "være",
];

const ROMANIAN: &[&str] = &[
    "a", "acea", "această", "acest", "al", "ale", "au", "că", "ce", "cu", "de", "din", "după",
    "ea", "ei", "el", "este", "eu", "fi", "în", "între", "la", "le", "lor", "lui", "mai", "mă",
    "ne", "noi", "nu", "o", "pe", "pentru", "prin", "sa", "său", "se", "și", "spre", "sunt",
    "tu", "un", "una", "unei", "va", "vom", "voi",
];

const SWEDISH: &[&str] = &[
    "alla", "att", "av", "blev", "bli", "de", "dem", "den", "denna", "deras", "dess", "det",
    "detta", "dig", "din", "du", "där", "efter", "ej", "eller", "en", "er", "ett", "från", "för",
    "ha", "hade", "han", "hans", "har", "henne", "hennes", "hon", "hur", "här", "i", "icke",
    "inom", "inte", "jag", "kan", "man", "med", "men", "mig", "min", "mot", "mycket", "ni", "nu",
    "när", "någon", "något", "och", "om", "oss", "på", "sig", "sin", "ska", "skulle", "som",
    "så", "till", "under", "upp", "ut", "utan", "vad", "var", "vara", "vi", "vid", "vilken",
];

const TAMIL: &[&str] = &[
    "ஒரு", "என்று", "மற்றும்", "இந்த", "அது", "இது", "என", "என்ன", "அந்த", "அவர்", "அவள்",
    "நான்", "நீ", "நாம்", "அவர்கள்", "மிக", "மேலும்", "ஆனால்", "அல்லது", "இல்லை", "உள்ள",
    "போல", "வேண்டும்", "முதல்", "வரை",
];

const TURKISH: &[&str] = &[
    "acaba", "ama", "ancak", "bana", "bazı", "belki", "ben", "bir", "biz", "bu", "çok", "çünkü",
    "da", "daha", "de", "değil", "diye", "eğer", "en", "gibi", "hem", "hep", "her", "hiç",
    "için", "ile", "ise", "kadar", "ki", "kim", "mı", "mi", "mu", "mü", "ne", "neden", "o",
    "ona", "onlar", "sen", "siz", "şey", "şu", "tüm", "ve", "veya", "ya", "yani",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::language::ALL_LANGUAGES;

    #[test]
    fn test_every_language_has_a_list() {
        for lang in ALL_LANGUAGES {
            assert!(!stop_words(*lang).is_empty(), "{:?}", lang);
        }
    }
}
