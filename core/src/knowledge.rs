use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Reference material handed to the model alongside every request.
pub trait KnowledgeBase: Send + Sync {
    fn context_blob(&self) -> String;
    fn search(&self, term: &str) -> Vec<KnowledgeEntry>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub category: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryFormat {
    #[default]
    QuestionAnswer,
    ProblemSolution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSection {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub format: EntryFormat,
    #[serde(default = "KnowledgeSection::default_searchable")]
    pub searchable: bool,
    #[serde(default)]
    pub entries: Vec<KnowledgeItem>,
}

impl KnowledgeSection {
    fn default_searchable() -> bool {
        true
    }

    fn not_searchable(mut self) -> Self {
        self.searchable = false;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub question: String,
    pub answer: String,
}

#[derive(thiserror::Error, Debug)]
pub enum KnowledgeError {
    #[error("failed to read knowledge file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid knowledge file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Knowledge held entirely in memory, either built in or read once from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticKnowledgeBase {
    pub role: String,
    #[serde(default)]
    pub sections: Vec<KnowledgeSection>,
}

impl StaticKnowledgeBase {
    pub fn from_yaml_str(contents: &str) -> Result<Self, KnowledgeError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let contents = fs::read_to_string(path).map_err(|source| KnowledgeError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn builtin() -> Self {
        Self {
            role: ROLE.trim().to_string(),
            sections: vec![
                section(
                    "DATAVIEW EXAMPLES",
                    "DataView",
                    EntryFormat::QuestionAnswer,
                    &[
                        (
                            "How do I create a basic DataView table?",
                            "Use TABLE with the fields to show, then narrow the source.\n\n\
                             ```dataview\nTABLE status, due-date\nFROM \"Projects\"\n\
                             WHERE status != null\nSORT due-date ASC\n```",
                        ),
                        (
                            "How do I create a list in DataView?",
                            "LIST prints one line per matching note.\n\n\
                             ```dataview\nLIST\nFROM #book\nSORT file.name ASC\n```",
                        ),
                        (
                            "How do I show open tasks across my vault?",
                            "TASK collects checkbox items from the matched notes.\n\n\
                             ```dataview\nTASK\nFROM \"Projects\"\nWHERE !completed\n```",
                        ),
                    ],
                ),
                section(
                    "TEMPLATER EXAMPLES",
                    "Templater",
                    EntryFormat::QuestionAnswer,
                    &[
                        (
                            "How do I insert today's date with Templater?",
                            "Use the date module inside a template tag: \
                             `<% tp.date.now(\"YYYY-MM-DD\") %>`.",
                        ),
                        (
                            "How do I build a daily note template?",
                            "Combine a title, navigation links and sections:\n\n\
                             ```\n# <% tp.date.now(\"dddd, MMMM D\") %>\n\
                             << [[<% tp.date.yesterday(\"YYYY-MM-DD\") %>]] | \
                             [[<% tp.date.tomorrow(\"YYYY-MM-DD\") %>]] >>\n\n\
                             ## Tasks\n- [ ] \n\n## Notes\n```",
                        ),
                    ],
                ),
                section(
                    "GENERAL OBSIDIAN TIPS",
                    "General Tip",
                    EntryFormat::QuestionAnswer,
                    &[
                        (
                            "How do I link notes together?",
                            "Wrap a note name in double brackets: `[[Note Name]]`. \
                             Add `|alias` to change the displayed text and `#Heading` \
                             to target a section.",
                        ),
                        (
                            "Should I organize with folders or tags?",
                            "Folders hold a note in one place; tags and links let a note \
                             belong to many topics. Keep folders shallow and lean on links.",
                        ),
                        (
                            "How do I search for notes modified recently?",
                            "DataView can filter on file metadata:\n\n\
                             ```dataview\nLIST\nWHERE file.mtime >= date(today) - dur(7 days)\n\
                             SORT file.mtime DESC\n```",
                        ),
                    ],
                ),
                section(
                    "COMMON PROBLEMS & SOLUTIONS",
                    "Problem",
                    EntryFormat::ProblemSolution,
                    &[
                        (
                            "A DataView query renders as a plain code block.",
                            "Enable the DataView community plugin and make sure the fence \
                             is tagged `dataview`.",
                        ),
                        (
                            "Templater tags are inserted literally instead of being evaluated.",
                            "Insert the template through Templater rather than the core \
                             Templates plugin, or enable trigger-on-file-creation.",
                        ),
                    ],
                )
                .not_searchable(),
            ],
        }
    }
}

impl Default for StaticKnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KnowledgeBase for StaticKnowledgeBase {
    fn context_blob(&self) -> String {
        let mut context = String::new();
        context.push_str("=== YOUR ROLE ===\n");
        context.push_str(&self.role);
        context.push_str("\n\n");
        for section in &self.sections {
            context.push_str(&format!("\n=== {} ===\n", section.title));
            for item in &section.entries {
                match section.format {
                    EntryFormat::QuestionAnswer => {
                        context.push_str(&format!("\n{}\n{}\n", item.question, item.answer));
                    }
                    EntryFormat::ProblemSolution => {
                        context.push_str(&format!(
                            "\nProblem: {}\nSolution: {}\n",
                            item.question, item.answer
                        ));
                    }
                }
            }
        }
        context
    }

    fn search(&self, term: &str) -> Vec<KnowledgeEntry> {
        let needle = term.to_lowercase();
        self.sections
            .iter()
            .filter(|section| section.searchable)
            .flat_map(|section| {
                section.entries.iter().filter_map(|item| {
                    let hit = item.question.to_lowercase().contains(&needle)
                        || item.answer.to_lowercase().contains(&needle);
                    hit.then(|| KnowledgeEntry {
                        category: section.category.clone(),
                        question: item.question.clone(),
                        answer: item.answer.clone(),
                    })
                })
            })
            .collect()
    }
}

const ROLE: &str = "
You are an expert Obsidian assistant with working knowledge of:
1. Obsidian core features and Markdown formatting
2. Community plugins such as DataView, Templater and Calendar
3. DataView queries and the search syntax
4. Vault organization and note-taking workflows

Answer with concrete, copyable examples whenever they help.
";

fn section(
    title: &str,
    category: &str,
    format: EntryFormat,
    entries: &[(&str, &str)],
) -> KnowledgeSection {
    KnowledgeSection {
        title: title.to_string(),
        category: category.to_string(),
        format,
        searchable: true,
        entries: entries
            .iter()
            .map(|(question, answer)| KnowledgeItem {
                question: (*question).to_string(),
                answer: (*answer).to_string(),
            })
            .collect(),
    }
}
