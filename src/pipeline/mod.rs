pub mod drafting; // Intake → clinical note + medical certificate drafts
