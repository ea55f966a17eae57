//! Fixed replies used when a generative-AI call fails or returns nothing

/// Greeting call failed
pub const GREETING_ON_ERROR: &str = "Xin chào! Hôm nay em có khỏe không?";

/// Greeting call returned blank text
pub const GREETING_ON_EMPTY: &str = "Xin chào! Chúng ta cùng bắt đầu nhé?";

/// Reply requested with no usable history
pub const REPLY_ON_EMPTY_HISTORY: &str = "Em có thể nói lại được không?";

/// Reply call returned blank text
pub const REPLY_ON_EMPTY: &str = "Mình không hiểu. Em có thể nói lại lần nữa được không?";

/// Reply call failed
pub const REPLY_ON_ERROR: &str = "Mình không nghe rõ, em có thể nói lại được không?";

/// Streamed reply broke off
pub const STREAM_APOLOGY: &str = "Xin lỗi, mình gặp chút sự cố.";

/// Summary call failed
pub const SUMMARY_ON_ERROR: &str = "Không thể tạo bản đánh giá tự động do có lỗi xảy ra.";

/// Analysis call failed
pub const ANALYSIS_ENGAGEMENT: &str = "Không xác định";
pub const ANALYSIS_NOTE: &str = "Không thể phân tích";
pub const ANALYSIS_ACCURACY: f64 = 50.0;
