//! User-facing messages for reportable outcomes, in the query's language.
//!
//! These are the answers that bypass synthesis entirely: when no source
//! exists, nothing may be invented, so the report is written here rather
//! than asked of the model.

use crate::types::Language;

/// Retrieval found no relevant source.
pub fn no_evidence(language: Language) -> String {
    match language {
        Language::Fr => "Je n'ai trouvé aucune source pertinente pour répondre à cette question. \
                         Essaie de reformuler ou d'être plus précis."
            .to_string(),
        Language::En => "I could not find any relevant source to answer this question. \
                         Try rephrasing or being more specific."
            .to_string(),
        Language::Ar => "لم أجد أي مصدر مناسب للإجابة عن هذا السؤال. حاول إعادة صياغة سؤالك."
            .to_string(),
    }
}

/// The requested week has no published timetable.
pub fn week_not_found(language: Language, requested: u32, available: &[u32]) -> String {
    let weeks = available
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    match language {
        Language::Fr => format!(
            "L'emploi du temps de la semaine {} n'est pas encore publié. \
             Semaines disponibles : {}.",
            requested, weeks
        ),
        Language::En => format!(
            "The timetable for week {} has not been published yet. \
             Available weeks: {}.",
            requested, weeks
        ),
        Language::Ar => format!(
            "جدول الأسبوع {} غير متوفر بعد. الأسابيع المتوفرة: {}.",
            requested, weeks
        ),
    }
}

/// No document has been uploaded this session.
pub fn no_documents(language: Language) -> String {
    match language {
        Language::Fr => "Aucun document n'a été ajouté pour le moment. \
                         Ajoute d'abord un fichier, puis pose ta question."
            .to_string(),
        Language::En => "No document has been uploaded yet. \
                         Add a file first, then ask your question."
            .to_string(),
        Language::Ar => "لم يتم رفع أي وثيقة بعد. أضف ملفاً أولاً ثم اطرح سؤالك.".to_string(),
    }
}

/// Extraction failed after its retry; partial sources may still be shown.
pub fn extraction_failed(language: Language) -> String {
    match language {
        Language::Fr => "Je n'ai pas réussi à consulter la source pour le moment. \
                         Réessaie dans quelques instants."
            .to_string(),
        Language::En => "I could not reach the source for now. Please try again shortly."
            .to_string(),
        Language::Ar => "تعذر الوصول إلى المصدر حالياً. حاول مرة أخرى بعد قليل.".to_string(),
    }
}

/// Prefix shown when synthesis stayed below the quality threshold.
pub fn degraded_notice(language: Language) -> &'static str {
    match language {
        Language::Fr => "(Réponse partielle — je n'ai pas pu faire mieux avec les informations disponibles.)",
        Language::En => "(Partial answer — I could not do better with the available information.)",
        Language::Ar => "(إجابة جزئية — لم أتمكن من تقديم أفضل من ذلك بالمعلومات المتاحة.)",
    }
}

/// Last-resort apology when the turn itself failed.
pub fn turn_failed(language: Language) -> &'static str {
    match language {
        Language::Fr => "Désolé, quelque chose s'est mal passé. Réessaie dans un instant.",
        Language::En => "Sorry, something went wrong. Please try again in a moment.",
        Language::Ar => "عذراً، حدث خطأ ما. حاول مرة أخرى بعد قليل.",
    }
}

/// Goodbye line for the interactive session.
pub fn goodbye(language: Language) -> &'static str {
    match language {
        Language::Fr => "Au revoir ! Bonne continuation !",
        Language::En => "Goodbye! Good luck with your studies!",
        Language::Ar => "مع السلامة! بالتوفيق في دراستك!",
    }
}
