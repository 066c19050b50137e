// Query Formatter
// Renders the fixed four-part prompt for one (sentence, question) pair

/// Fixed instruction line shared by every query.
pub const INSTRUCTION: &str = "Instruction: Read what the Clinician wrote about the patient in the \
Context and answer the Question by choosing from the provided Choices.";

/// Fixed answer choices offered to the model.
pub const CHOICES: &str = "Choices: yes; no; not relevant";

/// Render the prompt for one sentence unit against one category question.
/// Pure and total: the output is fully determined by the two inputs and the
/// fixed instruction/choices text. The trailing `"Answer: "` stub (with its
/// space, no terminal newline) is where the model continues.
pub fn format_query(question: &str, sentence: &str) -> String {
    let context = format!("Context: The Clinician wrote: \"{}\"", sentence);
    let question = format!(
        "Question: In the Clinician's opinion, \"{}\"",
        question.to_lowercase()
    );
    format!(
        "{}\n{}\n{}\n{}\nAnswer: ",
        INSTRUCTION, context, question, CHOICES
    )
}
