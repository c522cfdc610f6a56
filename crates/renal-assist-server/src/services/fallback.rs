//! Rule-based answers used whenever the generator cannot be reached.
//!
//! Output depends only on the message and the risk bucket, so the same
//! question always gets the same text.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::services::orchestrator::FallbackResponder;
use crate::services::response_cache::RiskBucket;

/// Advice text per topic. Topics with a single variant ignore the bucket.
enum Advice {
    Same(&'static str),
    ByFunction {
        preserved: &'static str,
        restricted: &'static str,
    },
}

struct Topic {
    name: &'static str,
    pattern: Lazy<Regex>,
    advice: Advice,
}

macro_rules! topic {
    ($name:expr, $re:expr, $advice:expr) => {
        Topic {
            name: $name,
            pattern: Lazy::new(|| Regex::new($re).expect("valid topic regex")),
            advice: $advice,
        }
    };
}

// Checked in order, first match wins
static TOPICS: [Topic; 14] = [
    topic!(
        "greeting",
        r"^(hello|hi|hey|greet)",
        Advice::Same(
            "👋 Hi there! I'm your kidney health assistant. Ask me about kidney function, diet, \
             exercise, medications or day-to-day habits and I'll do my best to help."
        )
    ),
    topic!(
        "kidney_function",
        r"kidney.*function|egfr|glomerular|filtration",
        Advice::ByFunction {
            preserved: "eGFR (estimated Glomerular Filtration Rate) shows how well your kidneys \
                filter waste from the blood. Your recent result sits in the normal-to-mild range.\n\n\
                **eGFR scale:**\n• 90+: normal\n• 60-89: mild reduction\n• 45-59: mild to moderate\n\
                • 30-44: moderate to severe\n• below 30: severe\n\n\
                Keep testing regularly so any change is caught early. 💪",
            restricted: "eGFR (estimated Glomerular Filtration Rate) shows how well your kidneys \
                filter waste from the blood.\n\n\
                **eGFR scale:**\n• 90+: normal\n• 60-89: mild reduction\n• 45-59: mild to moderate\n\
                • 30-44: moderate to severe\n• below 30: severe\n\n\
                With reduced function, follow-up with your nephrologist guides every treatment \
                decision. If you have not been tested recently, ask your doctor for a blood test. 🩸",
        }
    ),
    topic!(
        "symptoms",
        r"sign|symptom|warning|attention|problem|disease",
        Advice::Same(
            "⚠️ **Common signs your kidneys need attention:**\n\n\
             1. Swelling in feet, ankles, hands or face\n\
             2. Unusual tiredness or trouble concentrating\n\
             3. Changes in urination: foamy, dark or bloody urine\n\
             4. Blood pressure that stays above 130/80 mmHg\n\
             5. Loss of appetite, nausea or a metallic taste\n\n\
             See a doctor if any of these appear. Early detection slows progression. 🏥"
        )
    ),
    topic!(
        "diet",
        r"diet|food|eat|nutrition|meal",
        Advice::ByFunction {
            preserved: "🥗 **Eating well for your kidney stage:**\n\n\
                **Eat more:** fresh fruit, vegetables, lean proteins in moderate portions, whole grains, olive oil.\n\
                **Limit:** salt and processed food, sugary drinks, large meat portions.\n\n\
                Cook at home and season with herbs instead of salt. Your function is good, so you \
                have flexibility. 👍",
            restricted: "🥗 **Renal diet basics:**\n\n\
                **Focus on:** low sodium (under 2000 mg a day), portion-controlled protein, \
                phosphorus- and potassium-aware choices.\n\
                **Avoid:** bananas, oranges, tomatoes, potatoes, processed meats, cheese, nuts, salty snacks.\n\
                **Safer options:** apples, grapes, rice, pasta, small portions of chicken or fish, green beans.\n\n\
                A renal dietitian can tailor this to your lab values. 👨‍⚕️",
        }
    ),
    topic!(
        "exercise",
        r"exercise|activity|sport|fitness|workout|physical|movement",
        Advice::ByFunction {
            preserved: "💪 **Staying active:**\n\n\
                • Brisk walking 30 minutes, 5 days a week\n\
                • Swimming, cycling or yoga\n\
                • Light strength training 2-3 times a week\n\n\
                Warm up, stay hydrated and build intensity gradually.",
            restricted: "💪 **Gentle activity with reduced kidney function:**\n\n\
                • Short walks of 10-20 minutes\n\
                • Stretching, chair exercises or gentle yoga\n\
                • Avoid heavy lifting and exhausting sessions\n\n\
                Check with your care team before starting and stop if you feel dizzy or short of breath.",
        }
    ),
    topic!(
        "hydration",
        r"drink|water|hydrat|fluid|beverage",
        Advice::ByFunction {
            preserved: "💧 **Hydration:** aim for roughly 8 glasses of water a day, more when it is hot \
                or you exercise. Pale yellow urine is a good sign. Go easy on sugary drinks and alcohol.",
            restricted: "💧 **Fluid management:** with advanced kidney disease you may need a fluid \
                limit. Ask your nephrologist for your daily target, track what you drink, and watch \
                for swelling or sudden weight gain.",
        }
    ),
    topic!(
        "sodium",
        r"sodium|salt|salty",
        Advice::Same(
            "🧂 **Sodium control:** keep sodium under 2000-2300 mg a day. Read labels, skip canned \
             soups and processed meats, and flavour food with herbs, lemon or garlic instead of salt."
        )
    ),
    topic!(
        "potassium",
        r"potassium|banana|potato|tomato|orange",
        Advice::ByFunction {
            preserved: "🍌 **Potassium:** with your current function most people do not need to limit \
                potassium. Keep eating a varied diet and recheck if your labs change.",
            restricted: "⚠️ **Potassium limits:** high-potassium foods such as bananas, oranges, \
                potatoes and tomatoes may need to be restricted. Leaching vegetables (soak and boil) \
                lowers their potassium. Follow your latest lab results.",
        }
    ),
    topic!(
        "protein",
        r"protein|meat|chicken|fish|egg|dairy",
        Advice::ByFunction {
            preserved: "🥚 **Protein:** moderate portions of lean protein (fish, chicken, eggs, beans) \
                are fine. Avoid very high-protein diets and supplements unless your doctor approves.",
            restricted: "🥚 **Protein management:** smaller protein portions reduce the load on your \
                kidneys. A renal dietitian can set your daily target; prefer high-quality sources \
                like egg whites and fish.",
        }
    ),
    topic!(
        "monitoring",
        r"monitor|check|test|lab|how often|schedule",
        Advice::Same(
            "📊 **Monitoring schedule:** eGFR and urine albumin at least yearly when function is \
             normal, every 3-6 months with mild to moderate disease, and as often as your \
             nephrologist advises when it is advanced. Check blood pressure at home regularly."
        )
    ),
    topic!(
        "prevention",
        r"improve|prevent|better|slow down|progress|manage|control",
        Advice::Same(
            "📈 **Slowing progression:** control blood pressure and blood sugar, cut salt, stay \
             active, stop smoking, avoid regular use of painkillers like ibuprofen, and keep up \
             with your lab tests."
        )
    ),
    topic!(
        "stones",
        r"stone|pain|sharp|severe",
        Advice::Same(
            "🪨 **Kidney stones:** drink plenty of water, limit salt and animal protein, and go \
             easy on high-oxalate foods. Sudden severe back or side pain, fever or blood in the \
             urine needs urgent medical care."
        )
    ),
    topic!(
        "medication",
        r"medication|medicine|pill|drug|prescription|pharma",
        Advice::Same(
            "💊 **Medications:** take prescriptions exactly as directed, keep an up-to-date list, \
             and ask your pharmacist before any over-the-counter drug or supplement. Some \
             painkillers and herbal products can harm the kidneys."
        )
    ),
    topic!(
        "support",
        r"worry|concern|afraid|stress|help|support",
        Advice::Same(
            "💚 **You're not alone.** Feeling worried is normal. Many people with kidney disease \
             live full lives with good management. Talk to your care team, lean on family and \
             friends, and contact your doctor right away for urgent concerns. 💙"
        )
    ),
];

const TOPIC_MENUS: [&str; 3] = [
    "That's a great question! 🤔 Are you asking about:\n• Kidney function & testing?\n\
     • Diet & nutrition?\n• Exercise & activity?\n• Medications?\n• Symptoms or monitoring?\n\n\
     Let me know the topic and I'll give you detailed info! 😊",
    "I'm here to help! 💙 I can explain:\n• What kidney disease is and its stages\n\
     • How to eat for kidney health\n• Exercise & lifestyle tips\n• Medication management\n\
     • When to see a doctor\n\nWhat would you like to know more about?",
    "Good question! 👍 Tell me more about what interests you:\n• Understanding your test results?\n\
     • Tips for daily kidney health?\n• Specific dietary concerns?\n• Exercise recommendations?\n\n\
     I'll give you clear, practical answers! 📊",
];

/// Keyword-driven local responder
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalResponder;

impl LocalResponder {
    /// First topic matching an already lowercased message
    fn find_topic(lower: &str) -> Option<&'static Topic> {
        TOPICS.iter().find(|t| t.pattern.is_match(lower))
    }

    /// Stable menu pick: same message, same menu
    fn stable_pick(message: &str, n: usize) -> usize {
        let sum = message
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
        (sum % n as u64) as usize
    }
}

impl FallbackResponder for LocalResponder {
    fn respond(&self, message: &str, bucket: RiskBucket) -> String {
        let lower = message.trim().to_lowercase();

        if let Some(topic) = Self::find_topic(&lower) {
            let text = match &topic.advice {
                Advice::Same(text) => text,
                Advice::ByFunction {
                    preserved,
                    restricted,
                } => {
                    if bucket.has_preserved_function() {
                        preserved
                    } else {
                        restricted
                    }
                }
            };
            debug!("Local responder matched topic={} bucket={}", topic.name, bucket);
            return text.to_string();
        }

        debug!("Local responder found no topic, answering with a menu");
        TOPIC_MENUS[Self::stable_pick(&lower, TOPIC_MENUS.len())].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic_of(message: &str) -> Option<&'static str> {
        LocalResponder::find_topic(&message.trim().to_lowercase()).map(|t| t.name)
    }

    #[test]
    fn test_topic_order() {
        assert_eq!(topic_of("Hello!"), Some("greeting"));
        assert_eq!(topic_of("What does my eGFR mean?"), Some("kidney_function"));
        assert_eq!(topic_of("What should I eat?"), Some("diet"));
        assert_eq!(topic_of("is swimming good exercise"), Some("exercise"));
        assert_eq!(topic_of("too much salt?"), Some("sodium"));
        assert_eq!(topic_of("I'm so stressed"), Some("support"));
        assert_eq!(topic_of("tell me a joke"), None);
    }

    #[test]
    fn test_bucket_selects_variant() {
        let responder = LocalResponder;
        let healthy = responder.respond("what should i eat", RiskBucket::Healthy);
        let stage2 = responder.respond("what should i eat", RiskBucket::Stage2);
        let advanced = responder.respond("what should i eat", RiskBucket::Advanced);
        let unknown = responder.respond("what should i eat", RiskBucket::Unknown);

        assert_eq!(healthy, stage2);
        assert_ne!(healthy, advanced);
        assert_eq!(advanced, unknown);
        assert!(advanced.contains("Renal diet"));
    }

    #[test]
    fn test_single_variant_topic_ignores_bucket() {
        let responder = LocalResponder;
        assert_eq!(
            responder.respond("how much sodium", RiskBucket::Healthy),
            responder.respond("how much sodium", RiskBucket::Advanced)
        );
    }

    #[test]
    fn test_unmatched_message_is_deterministic() {
        let responder = LocalResponder;
        let a = responder.respond("tell me a joke", RiskBucket::Unknown);
        let b = responder.respond("tell me a joke", RiskBucket::Unknown);
        assert_eq!(a, b);
        assert!(TOPIC_MENUS.contains(&a.as_str()));
    }
}
