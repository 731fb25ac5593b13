//! Canned collaborators for demo mode and tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{GenerationRequest, MediaInput, ModelError, SpeechToText, TextGenerator, VisionExtractor};
use crate::pipeline::rag::conversation::lock;

pub const DEMO_TRANSCRIPT: &str =
    "I'm 34 years old, my AMH is 1.1 ng/mL and I have PCOS. Should I be worried?";

pub const DEMO_HORMONE_PANEL: &str = "Extracted from hormone panel:
- AMH: 1.1 ng/mL (slightly below average for age 34)
- FSH: 8.2 mIU/mL (day 3) - normal range
- LH: 5.1 mIU/mL - normal
- Estradiol: 45 pg/mL - normal follicular phase
- TSH: 2.1 mIU/L - optimal for fertility
Test date: 2024-12-01";

pub const DEMO_AMH_ANSWER: &str = "Thank you for sharing your information. Let me help you understand what this means:

**Understanding Your AMH Level:**
At 34 years old with an AMH of 1.1 ng/mL, your ovarian reserve is slightly below the average range (typically 1.5-4.0 ng/mL for your age), but this is still within a range where natural conception is possible for many women.

**PCOS Context:**
Having PCOS actually changes how we interpret AMH. Women with PCOS typically have higher AMH levels due to the accumulation of small follicles. Your level of 1.1 might actually represent better ovarian function than the same number would in someone without PCOS.

**What This Means:**
- Your ovarian reserve shows moderate activity
- With PCOS, ovulation regularity is often the key factor, not reserve
- Many women with similar profiles conceive successfully, especially with cycle monitoring
- Time is on your side at 34 - you have options to explore

**Recommended Next Steps:**
1. Track your ovulation patterns (BBT, LH tests, or ultrasound monitoring)
2. Discuss cycle regulation options with your RE if cycles are irregular
3. Consider a full fertility workup including HSG and partner analysis
4. Lifestyle optimization: PCOS responds well to nutrition and exercise

**Evidence Base:** This interpretation aligns with ASRM 2023 guidelines on ovarian reserve testing and ESHRE PCOS management recommendations.";

pub const DEMO_GENERIC_ANSWER: &str = "Based on the medical knowledge available, I can help explain fertility concepts, hormone levels, and treatment options. Please share specific questions or upload test results for detailed interpretation.";

/// Returns a fixed transcript.
#[derive(Debug)]
pub struct MockSpeechToText {
    transcript: String,
    calls: AtomicUsize,
}

impl MockSpeechToText {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSpeechToText {
    fn default() -> Self {
        Self::new(DEMO_TRANSCRIPT)
    }
}

impl SpeechToText for MockSpeechToText {
    fn transcribe(&self, _audio: &MediaInput) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.transcript.clone())
    }
}

/// Returns a fixed extraction for every image. PDFs go through the default
/// embedded-image walk, so each image yields the same text.
#[derive(Debug)]
pub struct MockVisionExtractor {
    extraction: String,
    calls: AtomicUsize,
}

impl MockVisionExtractor {
    pub fn new(extraction: &str) -> Self {
        Self {
            extraction: extraction.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockVisionExtractor {
    fn default() -> Self {
        Self::new(DEMO_HORMONE_PANEL)
    }
}

impl VisionExtractor for MockVisionExtractor {
    fn analyze_image(&self, _image: &MediaInput, _instruction: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.extraction.clone())
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    /// AMH answer when the prompt mentions AMH 1.1, generic answer otherwise.
    Demo,
    Fixed(String),
    Fail(ModelError),
}

/// Canned text generator that remembers the last request it saw.
#[derive(Debug)]
pub struct MockTextGenerator {
    reply: MockReply,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl MockTextGenerator {
    fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn demo() -> Self {
        Self::with_reply(MockReply::Demo)
    }

    pub fn fixed(response: &str) -> Self {
        Self::with_reply(MockReply::Fixed(response.to_string()))
    }

    pub fn failing(error: ModelError) -> Self {
        Self::with_reply(MockReply::Fail(error))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        lock(&self.last_request).clone()
    }
}

impl Default for MockTextGenerator {
    fn default() -> Self {
        Self::demo()
    }
}

impl TextGenerator for MockTextGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_request) = Some(request.clone());

        match &self.reply {
            MockReply::Demo => {
                let prompt = request.user_prompt.to_lowercase();
                if prompt.contains("amh") && prompt.contains("1.1") {
                    Ok(DEMO_AMH_ANSWER.to_string())
                } else {
                    Ok(DEMO_GENERIC_ANSWER.to_string())
                }
            }
            MockReply::Fixed(text) => Ok(text.clone()),
            MockReply::Fail(e) => Err(e.clone()),
        }
    }
}
