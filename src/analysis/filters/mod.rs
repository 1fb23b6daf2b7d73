pub mod lowercase;
pub mod max_length;
pub mod stemmer;
pub mod stopword;

pub use lowercase::LowercaseFilter;
pub use max_length::MaxLengthFilter;
pub use stemmer::StemmerFilter;
pub use stopword::StopWordFilter;
