pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS candidates (
  id TEXT PRIMARY KEY,
  username TEXT NOT NULL UNIQUE,
  role TEXT NOT NULL CHECK (role IN ('admin', 'candidate')),
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS questions (
  id TEXT PRIMARY KEY,
  text TEXT NOT NULL,
  tech_stack TEXT NOT NULL,
  created_by TEXT NOT NULL,
  created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_questions_stack ON questions(tech_stack);

CREATE TABLE IF NOT EXISTS sessions (
  id TEXT PRIMARY KEY,
  candidate_id TEXT NOT NULL REFERENCES candidates(id),
  tech_stack TEXT NOT NULL,
  status TEXT NOT NULL CHECK (status IN ('pending', 'in-progress', 'completed', 'evaluated')),
  started_at TEXT NOT NULL,
  ended_at TEXT
);

-- One pending/in-progress session per candidate.
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_active
  ON sessions(candidate_id) WHERE status IN ('pending', 'in-progress');

-- question_id is not a foreign key: the question bank is owned elsewhere.
CREATE TABLE IF NOT EXISTS responses (
  id TEXT PRIMARY KEY,
  session_id TEXT NOT NULL REFERENCES sessions(id),
  question_id TEXT NOT NULL,
  audio_path TEXT NOT NULL,
  transcription TEXT,
  score INTEGER CHECK (score IS NULL OR score BETWEEN 1 AND 10),
  justification TEXT,
  created_at TEXT NOT NULL,
  CHECK ((score IS NULL) = (justification IS NULL)),
  CHECK (score IS NULL OR transcription IS NOT NULL),
  UNIQUE (session_id, question_id)
);
"#;
